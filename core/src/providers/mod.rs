pub mod factory;
pub mod openai;

pub use factory::create_provider;
pub use openai::OpenAICompatibleProvider;
