//! Initial database migration.
//!
//! Creates the ledger tables, the document tables and the audit log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: DOCUMENTS
        // ============================================================
        db.execute_unprepared(STOCK_WRITE_OFFS_SQL).await?;
        db.execute_unprepared(STOCK_TAKES_SQL).await?;
        db.execute_unprepared(SETTLEMENT_DOCUMENTS_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: TRANSACTIONS & ITEMS
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(TRANSACTION_ITEMS_SQL).await?;

        // ============================================================
        // PART 4: AUDIT LOG
        // ============================================================
        db.execute_unprepared(AUDIT_LOG_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const STOCK_WRITE_OFFS_SQL: &str = r"
CREATE TABLE stock_write_offs (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    branch_id UUID NOT NULL,
    reason TEXT,
    status VARCHAR(16) NOT NULL DEFAULT 'DRAFT',
    transaction_id UUID,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    posted_at TIMESTAMPTZ,

    CONSTRAINT chk_stock_write_offs_status CHECK (status IN ('DRAFT', 'POSTED')),
    CONSTRAINT chk_stock_write_offs_posted CHECK (
        (status = 'POSTED') = (posted_at IS NOT NULL)
    )
);

CREATE INDEX idx_stock_write_offs_scope ON stock_write_offs(company_id, branch_id);

CREATE TABLE stock_write_off_items (
    id UUID PRIMARY KEY,
    write_off_id UUID NOT NULL REFERENCES stock_write_offs(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    product_id UUID,
    product_name VARCHAR(255) NOT NULL,
    quantity NUMERIC(20, 4) NOT NULL,
    unit_cost NUMERIC(20, 2) NOT NULL,

    CONSTRAINT chk_stock_write_off_items_quantity CHECK (quantity > 0),
    CONSTRAINT chk_stock_write_off_items_cost CHECK (unit_cost >= 0),
    CONSTRAINT uq_stock_write_off_items_position UNIQUE (write_off_id, position)
);
";

const STOCK_TAKES_SQL: &str = r"
CREATE TABLE stock_takes (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    branch_id UUID NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'DRAFT',
    transaction_id UUID,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    approved_at TIMESTAMPTZ,

    CONSTRAINT chk_stock_takes_status CHECK (status IN ('DRAFT', 'APPROVED'))
);

CREATE INDEX idx_stock_takes_scope ON stock_takes(company_id, branch_id);

CREATE TABLE stock_take_lines (
    id UUID PRIMARY KEY,
    stock_take_id UUID NOT NULL REFERENCES stock_takes(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    product_id UUID,
    product_name VARCHAR(255) NOT NULL,
    expected_quantity NUMERIC(20, 4) NOT NULL,
    counted_quantity NUMERIC(20, 4) NOT NULL,
    unit_cost NUMERIC(20, 2) NOT NULL,

    CONSTRAINT chk_stock_take_lines_quantities CHECK (
        expected_quantity >= 0 AND counted_quantity >= 0
    ),
    CONSTRAINT uq_stock_take_lines_position UNIQUE (stock_take_id, position)
);
";

const SETTLEMENT_DOCUMENTS_SQL: &str = r"
CREATE TABLE settlement_documents (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    branch_id UUID NOT NULL,
    kind VARCHAR(32) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'OPEN',
    reference VARCHAR(100) NOT NULL,
    customer_id UUID,
    supplier_id UUID,
    lines JSONB NOT NULL DEFAULT '[]',
    transaction_id UUID,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    settled_at TIMESTAMPTZ,

    CONSTRAINT chk_settlement_documents_kind CHECK (
        kind IN ('SALE', 'PURCHASE', 'SALES_RETURN', 'PURCHASE_RETURN')
    ),
    CONSTRAINT chk_settlement_documents_status CHECK (status IN ('OPEN', 'SETTLED'))
);

CREATE INDEX idx_settlement_documents_scope ON settlement_documents(company_id, branch_id);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    branch_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(16) NOT NULL,
    balance NUMERIC(20, 2) NOT NULL DEFAULT 0,

    -- Owner accounts
    owner_id UUID,
    is_primary BOOLEAN NOT NULL DEFAULT false,

    -- Subtype data
    bank_name VARCHAR(255),
    account_number VARCHAR(64),
    expense_category VARCHAR(100),
    write_off_id UUID REFERENCES stock_write_offs(id),
    written_off_amount NUMERIC(20, 2),

    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_accounts_kind CHECK (kind IN (
        'BANK', 'CASH', 'CUSTOMER', 'SUPPLIER', 'EXPENSE', 'SALES',
        'PURCHASES', 'WRITE_OFF', 'LOAN', 'BRANCH', 'EMPLOYEE'
    )),
    CONSTRAINT chk_accounts_owner CHECK (
        (kind IN ('CUSTOMER', 'SUPPLIER', 'LOAN', 'BRANCH', 'EMPLOYEE')) = (owner_id IS NOT NULL)
    ),
    CONSTRAINT chk_accounts_primary CHECK (NOT is_primary OR owner_id IS NOT NULL),
    CONSTRAINT chk_accounts_bank CHECK (kind <> 'BANK' OR bank_name IS NOT NULL)
);

-- At most one primary account per owner
CREATE UNIQUE INDEX uq_accounts_primary_owner ON accounts(kind, owner_id) WHERE is_primary;

CREATE INDEX idx_accounts_scope ON accounts(company_id, branch_id, kind);
CREATE INDEX idx_accounts_owner ON accounts(kind, owner_id) WHERE owner_id IS NOT NULL;
CREATE INDEX idx_accounts_write_off ON accounts(write_off_id) WHERE write_off_id IS NOT NULL;
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    branch_id UUID NOT NULL,
    customer_id UUID,
    supplier_id UUID,
    debit_account_id UUID NOT NULL REFERENCES accounts(id),
    credit_account_id UUID NOT NULL REFERENCES accounts(id),
    transaction_type VARCHAR(16) NOT NULL,
    category VARCHAR(32) NOT NULL,
    transaction_number VARCHAR(64) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'DRAFT',
    total_amount NUMERIC(20, 2) NOT NULL DEFAULT 0,
    reversal_applied BOOLEAN NOT NULL DEFAULT false,
    reference VARCHAR(100),
    description TEXT,
    transaction_date TIMESTAMPTZ NOT NULL,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_transactions_number UNIQUE (transaction_number),
    CONSTRAINT chk_transactions_type CHECK (transaction_type IN ('INCOMING', 'OUTGOING')),
    CONSTRAINT chk_transactions_category CHECK (category IN (
        'SALE', 'PURCHASE', 'SALES_RETURN', 'PURCHASE_RETURN', 'ADJUSTMENT',
        'TRANSFER', 'WRITE_OFF', 'PAYMENT', 'EXPENSE'
    )),
    CONSTRAINT chk_transactions_status CHECK (status IN (
        'DRAFT', 'PENDING', 'COMPLETED', 'FAILED', 'CANCELLED', 'REVERSED', 'VOIDED'
    )),
    CONSTRAINT chk_transactions_amount CHECK (total_amount >= 0),
    CONSTRAINT chk_transactions_accounts CHECK (debit_account_id <> credit_account_id),
    CONSTRAINT chk_transactions_reversal CHECK (
        NOT reversal_applied OR status IN ('CANCELLED', 'REVERSED', 'VOIDED')
    )
);

CREATE INDEX idx_transactions_scope ON transactions(company_id, branch_id, transaction_date);
CREATE INDEX idx_transactions_debit ON transactions(debit_account_id);
CREATE INDEX idx_transactions_credit ON transactions(credit_account_id);
CREATE INDEX idx_transactions_customer ON transactions(customer_id) WHERE customer_id IS NOT NULL;
CREATE INDEX idx_transactions_duplicate ON transactions(
    company_id, branch_id, debit_account_id, credit_account_id, category, created_at
);
";

const TRANSACTION_ITEMS_SQL: &str = r"
CREATE TABLE transaction_items (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    product_id UUID,
    product_name VARCHAR(255) NOT NULL,
    quantity NUMERIC(20, 4) NOT NULL,
    unit_price NUMERIC(20, 2) NOT NULL,
    tax_rate NUMERIC(5, 2) NOT NULL DEFAULT 0,
    total_price NUMERIC(20, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_transaction_items_quantity CHECK (quantity > 0),
    CONSTRAINT chk_transaction_items_price CHECK (unit_price >= 0),
    CONSTRAINT chk_transaction_items_tax CHECK (tax_rate >= 0 AND tax_rate <= 100)
);

CREATE INDEX idx_transaction_items_transaction ON transaction_items(transaction_id);
";

const AUDIT_LOG_SQL: &str = r"
CREATE TABLE audit_log (
    id UUID PRIMARY KEY,
    actor_id UUID NOT NULL,
    action VARCHAR(16) NOT NULL,
    entity VARCHAR(32) NOT NULL,
    entity_id UUID NOT NULL,
    before JSONB,
    after JSONB,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_audit_log_action CHECK (action IN ('CREATE', 'UPDATE', 'DELETE'))
);

CREATE INDEX idx_audit_log_entity ON audit_log(entity, entity_id, recorded_at);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS audit_log CASCADE;
DROP TABLE IF EXISTS transaction_items CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS settlement_documents CASCADE;
DROP TABLE IF EXISTS stock_take_lines CASCADE;
DROP TABLE IF EXISTS stock_takes CASCADE;
DROP TABLE IF EXISTS stock_write_off_items CASCADE;
DROP TABLE IF EXISTS stock_write_offs CASCADE;
";
