pub mod events;
pub mod multipart;
pub mod time;
