pub mod factcheck_worker;
pub mod prompt_worker;
pub mod worker;

pub use factcheck_worker::FactCheckWorker;
pub use prompt_worker::PromptWorker;
pub use worker::{Worker, WorkerRegistry};
