pub mod http_client;
pub mod batch;
pub mod chart_service;
pub mod exchange_rate_service;
pub mod price_service;
pub mod history_service;

pub use http_client::{BackoffPolicy, HttpClient, Pacing, ReqwestTransport, Transport};
pub use batch::BatchReport;
pub use chart_service::{ChartMode, ChartService, ChartSettings};
pub use exchange_rate_service::{load_exchange_rate, ExchangeRateService};
pub use price_service::PriceService;
pub use history_service::HistoryService;
