//! Initial schema: enums, invoices, settlements and history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS history CASCADE;
             DROP TABLE IF EXISTS settlements CASCADE;
             DROP TABLE IF EXISTS invoices CASCADE;
             DROP TYPE IF EXISTS settlement_status;
             DROP TYPE IF EXISTS invoice_source;
             DROP TYPE IF EXISTS invoice_status;
             DROP TYPE IF EXISTS business_entity;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Enum types
CREATE TYPE business_entity AS ENUM ('zloty_gron', 'srebrny_bucznik');
CREATE TYPE invoice_status AS ENUM ('unpaid', 'paid', 'partial');
CREATE TYPE invoice_source AS ENUM ('manual', 'csv', 'external_efaktura');
CREATE TYPE settlement_status AS ENUM ('pending', 'processing', 'processed', 'error');

-- Invoices
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entity business_entity NOT NULL,
    invoice_number VARCHAR(255) NOT NULL,
    contractor_name VARCHAR(255) NOT NULL,
    contractor_nip VARCHAR(32),
    contractor_address TEXT,
    net_amount NUMERIC(14, 2),
    vat_amount NUMERIC(14, 2),
    gross_amount NUMERIC(14, 2) NOT NULL,
    currency VARCHAR(8) NOT NULL DEFAULT 'PLN',
    issue_date DATE,
    sale_date DATE,
    payment_date DATE,
    account_number VARCHAR(64),
    payment_method VARCHAR(64),
    status invoice_status NOT NULL DEFAULT 'unpaid',
    category VARCHAR(255),
    source invoice_source NOT NULL DEFAULT 'manual',
    external_reference_number VARCHAR(128),
    document_keys JSONB NOT NULL DEFAULT '[]'::jsonb,
    raw_extracted JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- One invoice number per business entity
CREATE UNIQUE INDEX idx_invoices_entity_number ON invoices(entity, invoice_number);

-- Registry imports must not repeat
CREATE UNIQUE INDEX idx_invoices_external_ref ON invoices(external_reference_number)
    WHERE external_reference_number IS NOT NULL;

CREATE INDEX idx_invoices_entity_created ON invoices(entity, created_at DESC);
CREATE INDEX idx_invoices_status ON invoices(entity, status);

-- Settlements (statement batches; payments embedded as JSONB)
CREATE TABLE settlements (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entity business_entity NOT NULL,
    file_name VARCHAR(255) NOT NULL,
    status settlement_status NOT NULL DEFAULT 'pending',
    payments JSONB NOT NULL DEFAULT '[]'::jsonb,
    matched_count INTEGER NOT NULL DEFAULT 0,
    document_keys JSONB NOT NULL DEFAULT '[]'::jsonb,
    error_message TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_settlements_entity_created ON settlements(entity, created_at DESC);

-- Operation history (append-only)
CREATE TABLE history (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entity business_entity,
    action VARCHAR(64) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_history_created ON history(created_at DESC);
CREATE INDEX idx_history_entity ON history(entity, created_at DESC);
";
