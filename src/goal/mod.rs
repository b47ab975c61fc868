mod service;

pub use service::GoalService;
