//! Plain-text invoice rendering

use super::notify::NotifyError;
use crate::config::CurrencyConfig;
use crate::domain::aggregates::OrderSnapshot;
use crate::domain::value_objects::Money;
use crate::shipping::Destination;
use rust_decimal::Decimal;

/// Characters per line of the rendered document
pub const INVOICE_WIDTH: usize = 48;

/// Fixed-width text document builder
pub struct InvoiceBuilder {
    buf: String,
    width: usize,
}

impl InvoiceBuilder {
    pub fn new(width: usize) -> Self {
        Self { buf: String::with_capacity(2048), width }
    }

    /// Appends one line, cut at the document width.
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.buf.extend(s.chars().take(self.width));
        self.buf.push('\n');
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    pub fn rule(&mut self, ch: char) -> &mut Self {
        let rule: String = std::iter::repeat(ch).take(self.width).collect();
        self.line(&rule)
    }

    pub fn center(&mut self, s: &str) -> &mut Self {
        let pad = self.width.saturating_sub(s.chars().count()) / 2;
        let centered = format!("{}{}", " ".repeat(pad), s);
        self.line(&centered)
    }

    /// Left text and right-aligned text on one line; the left side is truncated to fit.
    pub fn columns(&mut self, left: &str, right: &str) -> &mut Self {
        let right_len = right.chars().count();
        let room = self.width.saturating_sub(right_len + 1);
        let left: String = left.chars().take(room).collect();
        let gap = self.width.saturating_sub(left.chars().count() + right_len).max(1);
        let row = format!("{}{}{}", left, " ".repeat(gap), right);
        self.line(&row)
    }

    pub fn build(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

/// Amounts in the currency the customer is billed in.
struct Pricing<'a> {
    destination: Destination,
    currency: &'a CurrencyConfig,
}

impl Pricing<'_> {
    fn show(&self, money: &Money) -> Result<String, NotifyError> {
        match self.destination {
            Destination::Domestic => Ok(money.to_string()),
            Destination::International => money
                .convert(self.currency.international_rate, &self.currency.international)
                .map(|m| m.to_string())
                .map_err(|e| NotifyError::Render(e.to_string())),
        }
    }

    fn show_amount(&self, amount: Decimal, currency: &str) -> Result<String, NotifyError> {
        self.show(&Money::new(amount, currency))
    }
}

pub fn render_invoice(snapshot: &OrderSnapshot, currency: &CurrencyConfig) -> Result<Vec<u8>, NotifyError> {
    let pricing = Pricing { destination: snapshot.shipping.destination, currency };
    let base = snapshot.total.currency();
    let address = &snapshot.shipping.address;

    let mut doc = InvoiceBuilder::new(INVOICE_WIDTH);
    doc.center("INVOICE").rule('=');
    doc.columns("Order", &snapshot.order_id)
        .columns("Payment ref", &snapshot.merchant_txn_id)
        .columns("Date", &snapshot.placed_at.format("%Y-%m-%d %H:%M UTC").to_string())
        .columns("Paid via", snapshot.provider.as_str())
        .rule('-');

    doc.line("Bill to:").line(&snapshot.customer.name);
    if let Some(email) = &snapshot.customer.email { doc.line(email); }
    if let Some(phone) = &snapshot.customer.phone { doc.line(phone); }
    doc.newline().line("Ship to:").line(&address.full_name).line(&address.line1);
    if let Some(line2) = &address.line2 { doc.line(line2); }
    let locality = [Some(address.city.as_str()), address.region.as_deref(), address.postal_code.as_deref()]
        .into_iter().flatten().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(", ");
    doc.line(&locality).line(&address.country).rule('-');

    for product in &snapshot.products {
        let label = format!("{} x{} ({})", product.title, product.quantity, product.size);
        doc.columns(&label, &pricing.show_amount(product.line_total, base)?);
        if product.discount_percent > Decimal::ZERO {
            doc.columns(&format!("  {}% off {}", product.discount_percent.normalize(), pricing.show_amount(product.original_price, base)?), "");
        }
    }

    doc.rule('-')
        .columns("Subtotal", &pricing.show(&snapshot.subtotal)?)
        .columns("Shipping", &pricing.show(&snapshot.shipping.cost)?)
        .columns("Total", &pricing.show(&snapshot.total)?)
        .rule('=')
        .center("Thank you for your order");
    Ok(doc.build())
}
