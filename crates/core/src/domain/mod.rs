pub mod emoji;

pub use emoji::{
    full_size_image_url, EmojiChange, EmojiLifecycleEvent, NotificationMessage,
    ANNOUNCEMENT_BANNER, FULL_SIZE_SELECTOR,
};
