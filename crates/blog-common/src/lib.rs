pub mod extract;
pub mod openrouter;
pub mod slug;
