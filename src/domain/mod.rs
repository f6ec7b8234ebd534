pub mod moderation;
pub mod tag_codec;
