use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::EFaturaError;
use super::types::*;

/// Builder for a fully loaded [`InvoiceGraph`].
///
/// Used where invoices are assembled outside the ERP database: tests,
/// fixtures and seeding the in-memory store. When no totals are given the
/// stored totals are derived from the lines at the standard KDV rate, the
/// same way the billing side computes them.
///
/// ```
/// use efatura::core::*;
/// use rust_decimal_macros::dec;
///
/// let graph = InvoiceBuilder::new(42)
///     .number("CAN2024000000042")
///     .customer(CustomerBuilder::new(7, "Acme Prodüksiyon").tax_number("1234567890").build())
///     .add_item(OrderItemBuilder::new(1, "Sony FX6", 2, dec!(100)).build())
///     .add_item(OrderItemBuilder::new(2, "Tripod", 1, dec!(50)).build())
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.invoice.total_amount, dec!(250));
/// assert_eq!(graph.invoice.grand_total, dec!(300.00));
/// ```
pub struct InvoiceBuilder {
    id: i64,
    number: Option<String>,
    invoice_date: Option<DateTime<Utc>>,
    due_date: Option<NaiveDate>,
    kind: InvoiceKind,
    status: InvoiceState,
    payment_method: Option<String>,
    paid_amount: Decimal,
    customer: Option<Customer>,
    order_id: Option<i64>,
    order_notes: Option<String>,
    items: Vec<OrderItem>,
    totals: Option<(Decimal, Decimal, Decimal)>,
}

impl InvoiceBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            number: None,
            invoice_date: None,
            due_date: None,
            kind: InvoiceKind::Sales,
            status: InvoiceState::Sent,
            payment_method: None,
            paid_amount: Decimal::ZERO,
            customer: None,
            order_id: None,
            order_notes: None,
            items: Vec::new(),
            totals: None,
        }
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn invoice_date(mut self, date: DateTime<Utc>) -> Self {
        self.invoice_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn kind(mut self, kind: InvoiceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn status(mut self, status: InvoiceState) -> Self {
        self.status = status;
        self
    }

    pub fn payment_method(mut self, label: impl Into<String>) -> Self {
        self.payment_method = Some(label.into());
        self
    }

    pub fn paid(mut self, amount: Decimal) -> Self {
        self.paid_amount = amount;
        self
    }

    pub fn customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn order_id(mut self, id: i64) -> Self {
        self.order_id = Some(id);
        self
    }

    pub fn order_notes(mut self, notes: impl Into<String>) -> Self {
        self.order_notes = Some(notes.into());
        self
    }

    pub fn add_item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    /// Stored totals as invoiced: net, VAT, gross.
    pub fn totals(mut self, net: Decimal, vat: Decimal, gross: Decimal) -> Self {
        self.totals = Some((net, vat, gross));
        self
    }

    pub fn build(self) -> Result<InvoiceGraph, EFaturaError> {
        let customer = self
            .customer
            .ok_or_else(|| EFaturaError::Validation("customer is required".into()))?;

        if self.items.len() > 10_000 {
            return Err(EFaturaError::Validation(
                "order cannot have more than 10,000 items".into(),
            ));
        }

        let (total_amount, vat_amount, grand_total) = match self.totals {
            Some(t) => t,
            None => {
                let net: Decimal = self.items.iter().map(OrderItem::line_amount).sum();
                let vat = (net * STANDARD_VAT_RATE / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                (net, vat, net + vat)
            }
        };

        let order_id = self.order_id.unwrap_or(self.id);
        let invoice = Invoice {
            id: self.id,
            invoice_number: self.number,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            kind: self.kind,
            status: self.status,
            total_amount,
            vat_amount,
            grand_total,
            paid_amount: self.paid_amount,
            payment_method: self.payment_method,
            customer_id: customer.id,
            order_id: Some(order_id),
        };

        Ok(InvoiceGraph {
            invoice,
            customer,
            order: Order {
                id: order_id,
                notes: self.order_notes,
                items: self.items,
            },
        })
    }
}

/// Builder for [`Customer`].
pub struct CustomerBuilder {
    customer: Customer,
}

impl CustomerBuilder {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            customer: Customer {
                id,
                name: name.into(),
                full_name: None,
                email: None,
                phone: None,
                tax_number: None,
                tax_office: None,
                address: None,
                city: None,
            },
        }
    }

    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.customer.full_name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.customer.email = Some(email.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.customer.phone = Some(phone.into());
        self
    }

    pub fn tax_number(mut self, tax_number: impl Into<String>) -> Self {
        self.customer.tax_number = Some(tax_number.into());
        self
    }

    pub fn tax_office(mut self, office: impl Into<String>) -> Self {
        self.customer.tax_office = Some(office.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>, city: impl Into<String>) -> Self {
        self.customer.address = Some(address.into());
        self.customer.city = Some(city.into());
        self
    }

    pub fn build(self) -> Customer {
        self.customer
    }
}

/// Builder for [`OrderItem`].
pub struct OrderItemBuilder {
    item: OrderItem,
}

impl OrderItemBuilder {
    pub fn new(id: i64, equipment: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            item: OrderItem {
                id,
                equipment: Some(Equipment {
                    id,
                    name: equipment.into(),
                }),
                quantity,
                unit_price,
                total_amount: None,
            },
        }
    }

    /// Stored line total, overriding `quantity * unit_price`.
    pub fn total(mut self, amount: Decimal) -> Self {
        self.item.total_amount = Some(amount);
        self
    }

    pub fn build(self) -> OrderItem {
        self.item
    }
}
