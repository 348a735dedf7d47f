pub mod adventure;
pub mod chapter;
pub mod character;
pub mod mention_link;
pub mod note;
pub mod region;
pub mod timeline_entry;
