const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_SHA: Option<&str> = option_env!("SLACKMOJI_GIT_SHA");
const BUILD_DATE: Option<&str> = option_env!("SLACKMOJI_BUILD_DATE");

const NOT_AVAILABLE: &str = "(n/a)";

pub fn run(verbose: bool) -> String {
    render(verbose, VERSION, GIT_SHA, BUILD_DATE)
}

fn render(verbose: bool, version: &str, sha: Option<&str>, date: Option<&str>) -> String {
    let version = if version.is_empty() { NOT_AVAILABLE.to_owned() } else { format!("v{version}") };
    if !verbose {
        return version;
    }

    let present = |value: Option<&str>| {
        value.filter(|value| !value.trim().is_empty()).unwrap_or(NOT_AVAILABLE).to_owned()
    };
    format!("Version:    {version}\nSHA:        {}\nBuilt On:   {}", present(sha), present(date))
}
