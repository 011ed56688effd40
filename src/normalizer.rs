//! Record normalization: CSV batch to transaction records.
//!
//! Validates the numeric columns the pipeline depends on and assigns
//! synthetic counterparty ids when the batch carries none.

use crate::config::NormalizerConfig;
use crate::error::{AnalysisError, Result};
use crate::types::transaction::{CounterpartyId, TransactionRecord};
use csv::{ReaderBuilder, StringRecord, Trim};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Read;
use tracing::debug;

const AMOUNT_COLUMN: &str = "Amount";
const CLASS_COLUMN: &str = "Class";
const SENDER_COLUMN: &str = "Sender";
const RECEIVER_COLUMN: &str = "Receiver";

/// Column positions resolved from the header row
struct ColumnLayout {
    amount: usize,
    class: usize,
    /// Present only when both Sender and Receiver columns exist
    counterparties: Option<(usize, usize)>,
}

impl ColumnLayout {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let amount = find(AMOUNT_COLUMN).ok_or_else(|| {
            AnalysisError::data_format(format!("missing required column '{}'", AMOUNT_COLUMN))
        })?;
        let class = find(CLASS_COLUMN).ok_or_else(|| {
            AnalysisError::data_format(format!("missing required column '{}'", CLASS_COLUMN))
        })?;
        let counterparties = find(SENDER_COLUMN).zip(find(RECEIVER_COLUMN));

        Ok(Self {
            amount,
            class,
            counterparties,
        })
    }
}

/// Turns a tabular batch into validated transaction records.
pub struct RecordNormalizer {
    config: NormalizerConfig,
}

impl RecordNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Parse a CSV payload held in memory.
    pub fn normalize_bytes(&self, payload: &[u8]) -> Result<Vec<TransactionRecord>> {
        self.normalize_csv(payload)
    }

    /// Parse a CSV stream with a header row.
    ///
    /// Requires `Amount` and `Class`; uses `Sender`/`Receiver` when both are
    /// present, otherwise draws ids from the seeded generator.
    pub fn normalize_csv<R: Read>(&self, reader: R) -> Result<Vec<TransactionRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let layout = ColumnLayout::resolve(reader.headers()?)?;

        let mut amounts = Vec::new();
        let mut labels = Vec::new();
        let mut parties = Vec::new();

        for (index, row) in reader.records().enumerate() {
            let row = row?;
            // Header is line 1
            let line = index + 2;

            amounts.push(parse_amount(field(&row, layout.amount, line)?, line)?);
            labels.push(parse_class(field(&row, layout.class, line)?, line)?);

            if let Some((sender, receiver)) = layout.counterparties {
                let sender = parse_id(field(&row, sender, line)?, SENDER_COLUMN, line)?;
                let receiver = parse_id(field(&row, receiver, line)?, RECEIVER_COLUMN, line)?;
                parties.push((sender, receiver));
            }
        }

        if layout.counterparties.is_none() {
            parties = self.synthesize_counterparties(amounts.len());
        }

        debug!(
            rows = amounts.len(),
            synthetic_ids = layout.counterparties.is_none(),
            "Normalized transaction batch"
        );

        Ok(amounts
            .into_iter()
            .zip(labels)
            .zip(parties)
            .map(|((amount, fraud), (sender, receiver))| {
                TransactionRecord::new(amount, sender, receiver, fraud)
            })
            .collect())
    }

    /// Draw `rows` sender ids, then `rows` receiver ids, from the fixed seed.
    pub fn synthesize_counterparties(&self, rows: usize) -> Vec<(CounterpartyId, CounterpartyId)> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let range = self.config.id_low..self.config.id_high;

        let senders: Vec<CounterpartyId> =
            (0..rows).map(|_| rng.gen_range(range.clone())).collect();
        let receivers: Vec<CounterpartyId> =
            (0..rows).map(|_| rng.gen_range(range.clone())).collect();

        senders.into_iter().zip(receivers).collect()
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

fn field<'r>(row: &'r StringRecord, index: usize, line: usize) -> Result<&'r str> {
    row.get(index)
        .ok_or_else(|| AnalysisError::data_format(format!("line {}: missing field", line)))
}

fn parse_amount(raw: &str, line: usize) -> Result<f64> {
    let amount: f64 = raw.parse().map_err(|_| {
        AnalysisError::data_format(format!(
            "line {}: {} value '{}' is not numeric",
            line, AMOUNT_COLUMN, raw
        ))
    })?;

    if !amount.is_finite() {
        return Err(AnalysisError::data_format(format!(
            "line {}: {} value '{}' is not finite",
            line, AMOUNT_COLUMN, raw
        )));
    }
    Ok(amount)
}

fn parse_class(raw: &str, line: usize) -> Result<bool> {
    let invalid = || {
        AnalysisError::data_format(format!(
            "line {}: {} value '{}' is not 0 or 1",
            line, CLASS_COLUMN, raw
        ))
    };

    // Exported frames often write labels as floats ("1.0")
    let value: f64 = raw.parse().map_err(|_| invalid())?;
    if value == 0.0 {
        Ok(false)
    } else if value == 1.0 {
        Ok(true)
    } else {
        Err(invalid())
    }
}

fn parse_id(raw: &str, column: &str, line: usize) -> Result<CounterpartyId> {
    raw.parse().map_err(|_| {
        AnalysisError::data_format(format!(
            "line {}: {} value '{}' is not an integer id",
            line, column, raw
        ))
    })
}
