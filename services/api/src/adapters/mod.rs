pub mod answer_llm;
pub mod db;
pub mod extract;
pub mod mail;
pub mod memory;
pub mod oauth;

pub use answer_llm::OpenAiAnswerAdapter;
pub use db::DbAdapter;
pub use extract::DocumentTextExtractor;
pub use mail::{HttpMailAdapter, LogMailAdapter};
pub use memory::MemoryStore;
pub use oauth::OAuthAdapter;
