pub mod accounting_repository;
pub mod credit_score_repository;

pub use accounting_repository::{
    AccountingDataSource, MySqlAccountingRepository, StaticAccountingDataSource,
};
pub use credit_score_repository::{
    CreditScoreStore, InMemoryCreditScoreStore, MySqlCreditScoreRepository,
};
