//! `SeaORM` entity definitions.

pub mod history;
pub mod invoices;
pub mod sea_orm_active_enums;
pub mod settlements;
