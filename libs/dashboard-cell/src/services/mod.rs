pub mod aggregate;
pub mod dashboard;

pub use dashboard::DashboardService;
