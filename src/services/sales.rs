use crate::{
    config::CompanyConfig,
    db::DbPool,
    entities::{
        product, sale, sale::PaymentMethod, sale_item, Product, Sale, SaleItem,
    },
    errors::ServiceError,
};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts before invoice allocation gives up with a server error
const MAX_INVOICE_ATTEMPTS: u32 = 5;
/// Pause between allocation attempts
const INVOICE_RETRY_DELAY: Duration = Duration::from_millis(50);

const SALE_STATUS_COMPLETED: &str = "completed";

/// Invoice numbers: `INV-YYYYMMDD-NNNN`, sequence scoped to the calendar day
static INVOICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^INV-(\d{8})-(\d{4,})$").expect("valid invoice number regex"));

/// `INV-YYYYMMDD-` prefix shared by all of a day's invoices
pub fn invoice_day_prefix(date: NaiveDate) -> String {
    format!("INV-{}-", date.format("%Y%m%d"))
}

/// Successor of the day's highest invoice number (1 when the day is empty)
pub fn next_invoice_number(date: NaiveDate, last: Option<&str>) -> String {
    let next = last
        .and_then(|inv| INVOICE_RE.captures(inv))
        .and_then(|caps| caps.get(2))
        .and_then(|suffix| suffix.as_str().parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("INV-{}-{:04}", date.format("%Y%m%d"), next)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleRequest {
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_amount: Decimal,
    /// Defaults to now
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "A sale needs at least one item"))]
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
}

#[derive(Debug, Serialize)]
pub struct SaleListResponse {
    pub sales: Vec<sale::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Filters for the sales listing
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
}

/// One printable line of an invoice document
#[derive(Debug, Serialize)]
pub struct InvoiceLine {
    pub product_code: String,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

/// Everything the external PDF renderer needs for one invoice
#[derive(Debug, Serialize)]
pub struct InvoiceDocument {
    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub total: Decimal,
    pub payment_amount: Decimal,
    pub change_amount: Decimal,
    pub lines: Vec<InvoiceLine>,
    /// Suggested download filename, `Invoice-<invoice_number>.pdf`
    pub filename: String,
}

/// Service for the sale transaction workflow. Stateless per invocation; the
/// only persistent transition is Sale: nonexistent -> completed.
#[derive(Clone)]
pub struct SaleService {
    db: Arc<DbPool>,
}

impl SaleService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Validates a cart and atomically persists a completed sale.
    ///
    /// The header, every line item, and the per-line stock decrements land in
    /// one transaction; any failure rolls the whole sale back. Invoice-number
    /// allocation is optimistic: derive the day's next number, then let the
    /// unique constraint arbitrate, retrying a bounded number of times.
    #[instrument(skip(self, request), fields(item_count = request.items.len()))]
    pub async fn create_sale(
        &self,
        request: CreateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
            if item.price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Price must not be negative".to_string(),
                ));
            }
        }

        let total: Decimal = request
            .items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();

        if request.payment_amount < total {
            return Err(ServiceError::PaymentFailed(format!(
                "Payment amount {} is less than total {}",
                request.payment_amount, total
            )));
        }

        let change_amount = request.payment_amount - total;
        let payment_date = request.payment_date.unwrap_or_else(Utc::now);

        for attempt in 1..=MAX_INVOICE_ATTEMPTS {
            let today = Utc::now().date_naive();
            let candidate = self.derive_invoice_number(today).await?;

            // A concurrent checkout may have claimed the candidate between
            // derivation and here; cheap check before paying for the insert.
            let taken = Sale::find()
                .filter(sale::Column::InvoiceNumber.eq(&candidate))
                .one(&*self.db)
                .await?
                .is_some();
            if taken {
                warn!(attempt, candidate = %candidate, "Invoice number collision, retrying");
                tokio::time::sleep(INVOICE_RETRY_DELAY).await;
                continue;
            }

            match self
                .persist_sale(&request, &candidate, total, change_amount, payment_date)
                .await
            {
                Ok(response) => {
                    info!(
                        sale_id = %response.sale.id,
                        invoice_number = %response.sale.invoice_number,
                        total = %response.sale.total,
                        "Sale completed"
                    );
                    return Ok(response);
                }
                // The unique constraint caught a race the check missed
                Err(ServiceError::Conflict(_)) => {
                    warn!(attempt, candidate = %candidate, "Invoice number lost to concurrent insert, retrying");
                    tokio::time::sleep(INVOICE_RETRY_DELAY).await;
                }
                Err(other) => return Err(other),
            }
        }

        Err(ServiceError::InternalError(
            "Failed to generate unique invoice number".to_string(),
        ))
    }

    /// Inserts header, items, and stock decrements inside one transaction
    async fn persist_sale(
        &self,
        request: &CreateSaleRequest,
        invoice_number: &str,
        total: Decimal,
        change_amount: Decimal,
        payment_date: DateTime<Utc>,
    ) -> Result<SaleResponse, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();
        let sale_id = Uuid::new_v4();

        let header = sale::ActiveModel {
            id: Set(sale_id),
            invoice_number: Set(invoice_number.to_string()),
            customer_name: Set(request.customer_name.clone()),
            total: Set(total),
            payment_amount: Set(request.payment_amount),
            change_amount: Set(change_amount),
            payment_method: Set(request.payment_method),
            status: Set(SALE_STATUS_COMPLETED.to_string()),
            notes: Set(request.notes.clone()),
            payment_date: Set(payment_date),
            created_at: Set(now),
        };

        let header = header.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!("Invoice number {} already exists", invoice_number))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            // Missing product aborts the transaction: no partial sale, no
            // partial stock adjustment survives.
            let product = Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            let item = sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                price: Set(line.price),
                subtotal: Set(line.price * Decimal::from(line.quantity)),
                created_at: Set(now),
            };
            items.push(item.insert(&txn).await?);

            // Decrement is unconditional on the line quantity; the sale owns
            // the stock movement even past a stale read.
            let new_stock = product.stock - line.quantity;
            let mut product: product::ActiveModel = product.into();
            product.stock = Set(new_stock);
            product.updated_at = Set(Some(now));
            product.update(&txn).await?;
        }

        txn.commit().await?;

        Ok(SaleResponse {
            sale: header,
            items,
        })
    }

    /// Finds the day's highest invoice number and increments its suffix
    async fn derive_invoice_number(&self, date: NaiveDate) -> Result<String, ServiceError> {
        let prefix = invoice_day_prefix(date);
        let last = Sale::find()
            .filter(sale::Column::InvoiceNumber.starts_with(&prefix))
            .order_by_desc(sale::Column::InvoiceNumber)
            .one(&*self.db)
            .await?;

        Ok(next_invoice_number(
            date,
            last.as_ref().map(|s| s.invoice_number.as_str()),
        ))
    }

    /// Fetches a sale with its line items
    #[instrument(skip(self))]
    pub async fn get_sale(&self, id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = Sale::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;

        let items = SaleItem::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .order_by_asc(sale_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(SaleResponse { sale, items })
    }

    /// Lists sales newest first, optionally filtered by date range and tender
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        filter: SaleFilter,
        page: u64,
        per_page: u64,
    ) -> Result<SaleListResponse, ServiceError> {
        let mut query = Sale::find();

        if let Some(start) = filter.start_date {
            let start = start
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .and_utc();
            query = query.filter(sale::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            // Inclusive end date: everything before the following midnight
            let end = end
                .succ_opt()
                .unwrap_or(end)
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .and_utc();
            query = query.filter(sale::Column::CreatedAt.lt(end));
        }
        if let Some(method) = filter.payment_method {
            query = query.filter(sale::Column::PaymentMethod.eq(method));
        }

        let paginator = query
            .order_by_desc(sale::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(SaleListResponse {
            sales,
            total,
            page,
            per_page,
        })
    }

    /// Assembles the payload the external PDF renderer consumes
    #[instrument(skip(self, company))]
    pub async fn invoice_document(
        &self,
        id: Uuid,
        company: &CompanyConfig,
    ) -> Result<InvoiceDocument, ServiceError> {
        let sale = Sale::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;

        let items = SaleItem::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .find_also_related(Product)
            .order_by_asc(sale_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let lines = items
            .into_iter()
            .map(|(item, product)| {
                let (code, name) = product
                    .map(|p| (p.code, p.name))
                    .unwrap_or_else(|| (String::new(), "(deleted product)".to_string()));
                InvoiceLine {
                    product_code: code,
                    product_name: name,
                    quantity: item.quantity,
                    price: item.price,
                    subtotal: item.subtotal,
                }
            })
            .collect();

        let filename = format!("Invoice-{}.pdf", sale.invoice_number);
        Ok(InvoiceDocument {
            company_name: company.name.clone(),
            company_address: company.address.clone(),
            company_phone: company.phone.clone(),
            invoice_number: sale.invoice_number,
            customer_name: sale.customer_name,
            payment_method: sale.payment_method,
            payment_date: sale.payment_date,
            total: sale.total,
            payment_amount: sale.payment_amount,
            change_amount: sale.change_amount,
            lines,
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn invoice_numbers_are_day_scoped_and_zero_padded() {
        let date = day(2025, 6, 1);
        assert_eq!(next_invoice_number(date, None), "INV-20250601-0001");
        assert_eq!(
            next_invoice_number(date, Some("INV-20250601-0007")),
            "INV-20250601-0008"
        );
        assert_eq!(
            next_invoice_number(date, Some("INV-20250601-0099")),
            "INV-20250601-0100"
        );
    }

    #[test]
    fn malformed_predecessors_restart_the_sequence() {
        let date = day(2025, 6, 1);
        assert_eq!(
            next_invoice_number(date, Some("INV-BROKEN")),
            "INV-20250601-0001"
        );
    }

    #[test]
    fn day_prefix_formats_the_date() {
        assert_eq!(invoice_day_prefix(day(2025, 12, 31)), "INV-20251231-");
        assert_eq!(invoice_day_prefix(day(2026, 1, 2)), "INV-20260102-");
    }
}
