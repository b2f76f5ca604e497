//! Report
//!
//! Terminal rendering of an allocation: one row per allocated proposal, grouped under the cart
//! line it landed on, followed by the cart totals and any buyer-facing messages.

use std::io;

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    allocator::{AllocatorInput, AllocatorOutput, LineAllocation},
    cart::{CartError, CartIndex},
    pricing::{PricingError, target_price, total_price},
};

/// Errors that can occur when rendering a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The cart could not be indexed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Error summing line prices or allocations.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Totals of an allocated cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    /// Sum of every line price before discounts
    pub subtotal: Decimal,

    /// Sum of every allocation
    pub discounts: Decimal,

    /// Subtotal less discounts
    pub total: Decimal,
}

/// Allocation report for one cart.
#[derive(Debug)]
pub struct AllocationReport<'a> {
    input: &'a AllocatorInput,
    output: &'a AllocatorOutput,
    currency: Option<&'static Currency>,
}

impl<'a> AllocationReport<'a> {
    /// Pair an allocator output with the input it was computed from.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] if the cart fails validation.
    pub fn new(input: &'a AllocatorInput, output: &'a AllocatorOutput) -> Result<Self, ReportError> {
        let currency = CartIndex::build(&input.cart)?.currency();

        Ok(Self {
            input,
            output,
            currency,
        })
    }

    /// Currency of the cart, when the lines carry one.
    pub fn currency(&self) -> Option<&'static Currency> {
        self.currency
    }

    /// Cart totals before and after the allocated discounts.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] if a sum overflows.
    pub fn totals(&self) -> Result<Totals, ReportError> {
        let line_prices = self
            .input
            .cart
            .lines
            .iter()
            .map(|line| target_price(line.unit_amount(), line.quantity))
            .collect::<Result<SmallVec<[Decimal; 8]>, _>>()?;

        let subtotal = total_price(line_prices)?;

        let line_discounts = self
            .output
            .line_discounts
            .iter()
            .map(LineAllocation::total)
            .collect::<Result<SmallVec<[Decimal; 8]>, _>>()?;

        let discounts = total_price(line_discounts)?;

        let total = subtotal
            .checked_sub(discounts)
            .ok_or(PricingError::Overflow)?;

        Ok(Totals {
            subtotal,
            discounts,
            total,
        })
    }

    /// Write the report table, totals and messages.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] if a sum overflows or writing fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let mut builder = Builder::default();
        let mut line_boundary_rows: SmallVec<[usize; 8]> = SmallVec::new();
        let mut row = 1;

        builder.push_record(["Line", "Qty", "Unit Price", "Proposal", "Discount"]);

        for line in &self.input.cart.lines {
            line_boundary_rows.push(row);

            let unit_price = self.format_amount(line.unit_amount());
            let allocations = self
                .output
                .line(&line.id)
                .map(|allocated| allocated.allocations.as_slice())
                .unwrap_or_default();

            if allocations.is_empty() {
                builder.push_record([
                    line.id.clone(),
                    line.quantity.to_string(),
                    unit_price,
                    String::new(),
                    String::new(),
                ]);
                row += 1;
                continue;
            }

            for (idx, allocation) in allocations.iter().enumerate() {
                let discount = format!("-{}", self.format_amount(allocation.amount));

                if idx == 0 {
                    builder.push_record([
                        line.id.clone(),
                        line.quantity.to_string(),
                        unit_price.clone(),
                        allocation.discount_proposal_id.clone(),
                        discount,
                    ]);
                } else {
                    builder.push_record([
                        String::new(),
                        String::new(),
                        String::new(),
                        allocation.discount_proposal_id.clone(),
                        discount,
                    ]);
                }

                row += 1;
            }
        }

        write_report_table(&mut out, builder, &line_boundary_rows)?;
        self.write_summary(&mut out)?;
        self.write_messages(&mut out)
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReportError> {
        let totals = self.totals()?;

        let rows = [
            (" Subtotal:", self.format_amount(totals.subtotal)),
            (" Discounts:", format!("-{}", self.format_amount(totals.discounts))),
            (" \x1b[1mTotal:\x1b[0m", self.format_amount(totals.total)),
        ];

        let label_width = rows
            .iter()
            .map(|(label, _)| visible_width(label))
            .max()
            .unwrap_or_default();

        let value_width = rows
            .iter()
            .map(|(_, value)| value.len())
            .max()
            .unwrap_or_default();

        for (label, value) in &rows {
            let label_pad = label_width.saturating_sub(visible_width(label));

            writeln!(out, "{:>label_pad$}{label}  {value:>value_width$}", "")
                .map_err(|_err| ReportError::IO)?;
        }

        writeln!(out).map_err(|_err| ReportError::IO)
    }

    fn write_messages(&self, out: &mut impl io::Write) -> Result<(), ReportError> {
        if self.output.displayable_errors.is_empty() {
            return Ok(());
        }

        writeln!(out, " Messages:").map_err(|_err| ReportError::IO)?;

        for error in &self.output.displayable_errors {
            writeln!(out, "   {}: {}", error.discount_id, error.reason)
                .map_err(|_err| ReportError::IO)?;
        }

        writeln!(out).map_err(|_err| ReportError::IO)
    }

    fn format_amount(&self, amount: Decimal) -> String {
        match self.currency {
            Some(currency) => Money::from_decimal(amount, currency).to_string(),
            None => amount.normalize().to_string(),
        }
    }
}

fn write_report_table(
    out: &mut impl io::Write,
    builder: Builder,
    line_boundary_rows: &[usize],
) -> Result<(), ReportError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    for &row in line_boundary_rows {
        if row > 1 {
            theme.insert_horizontal_line(row, separator);
        }
    }

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..3), Alignment::right());
    table.modify(Columns::new(4..5), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReportError::IO)
}

/// Width of a string ignoring ANSI escape sequences.
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch == 'm' {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;
    use testresult::TestResult;

    use crate::{
        allocator::{Allocation, DisplayableError},
        cart::{Cart, tests::line},
    };

    use super::*;

    fn input() -> AllocatorInput {
        AllocatorInput {
            cart: Cart {
                lines: vec![line("wig", 150, 2), line("cap", 20, 1)],
            },
            discounts: Vec::new(),
        }
    }

    fn output() -> AllocatorOutput {
        AllocatorOutput {
            line_discounts: vec![LineAllocation {
                cart_line_id: "wig".to_string(),
                quantity: 2,
                allocations: smallvec![
                    Allocation {
                        discount_proposal_id: "ten-off".to_string(),
                        amount: Decimal::from(30),
                    },
                    Allocation {
                        discount_proposal_id: "bundle".to_string(),
                        amount: Decimal::new(1250, 2),
                    },
                ],
            }],
            displayable_errors: vec![DisplayableError {
                discount_id: "summer".to_string(),
                reason: "Some items in cart are not eligible for discount".to_string(),
            }],
        }
    }

    #[test]
    fn totals_subtract_every_allocation() -> TestResult {
        let input = input();
        let output = output();
        let report = AllocationReport::new(&input, &output)?;

        assert_eq!(
            report.totals()?,
            Totals {
                subtotal: Decimal::from(320),
                discounts: Decimal::new(4250, 2),
                total: Decimal::new(27750, 2),
            }
        );

        Ok(())
    }

    #[test]
    fn write_to_renders_lines_proposals_and_messages() -> TestResult {
        let input = input();
        let output = output();
        let report = AllocationReport::new(&input, &output)?;

        let mut out = Vec::new();
        report.write_to(&mut out)?;

        let rendered = String::from_utf8(out)?;

        assert!(rendered.contains("wig"));
        assert!(rendered.contains("cap"));
        assert!(rendered.contains("ten-off"));
        assert!(rendered.contains("bundle"));
        assert!(rendered.contains("Subtotal:"));
        assert!(rendered.contains("Total:"));
        assert!(rendered.contains("summer: Some items in cart are not eligible for discount"));

        Ok(())
    }

    #[test]
    fn write_to_skips_messages_when_there_are_none() -> TestResult {
        let input = input();
        let output = AllocatorOutput::default();
        let report = AllocationReport::new(&input, &output)?;

        let mut out = Vec::new();
        report.write_to(&mut out)?;

        let rendered = String::from_utf8(out)?;

        assert!(!rendered.contains("Messages:"));
        assert_eq!(report.totals()?.discounts, Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn visible_width_ignores_escape_codes() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
    }
}
