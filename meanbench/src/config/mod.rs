mod batch;
mod scenario;

pub use self::{batch::BatchArgs, scenario::Scenario};
