use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use serde_json::json;

const TEXT_COLUMN: &str = "RequirementText";

const LABELS: [&str; 5] = [
    "Functional (F)",
    "Availability (A)",
    "Performance (PE)",
    "Security (SE)",
    "Usability (US)",
];

const SUBJECTS: [&str; 6] = [
    "The system",
    "The login page",
    "The report generator",
    "The mobile client",
    "The payment service",
    "The admin console",
];

const PREDICATES: [(&str, usize); 8] = [
    ("shall let users export data as CSV", 0),
    ("must be available 99.9% of the time", 1),
    ("must respond within 2 seconds", 2),
    ("shall encrypt stored passwords", 3),
    ("should be usable without training", 4),
    ("shall log every failed sign-in attempt", 3),
    ("must recover from a crash within 5 minutes", 1),
    ("shall render a page in under 1 second", 2),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// Indicator encodings seen in hand-maintained sheets.
enum Indicator {
    Number(f64),
    Text(&'static str),
    Bool(bool),
    Blank,
}

fn indicator(rng: &mut SimpleRng, active: bool) -> Indicator {
    match (rng.below(5), active) {
        (0, true) => Indicator::Text("yes"),
        (0, false) => Indicator::Text("No"),
        (1, a) => Indicator::Bool(a),
        (2, true) => Indicator::Number(0.55 + rng.next_f64() * 0.45),
        (2, false) => Indicator::Blank,
        (_, a) => Indicator::Number(if a { 1.0 } else { 0.0 }),
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Dataset")?;

    sheet.write_string(0, 0, TEXT_COLUMN)?;
    for (col, label) in LABELS.iter().enumerate() {
        sheet.write_string(0, col as u16 + 1, *label)?;
    }

    let mut row: u32 = 0;
    for subject in &SUBJECTS {
        for &(predicate, primary) in &PREDICATES {
            row += 1;

            // Every 13th row has no text, to exercise the empty-text skip.
            if row % 13 != 0 {
                sheet.write_string(row, 0, format!("{subject} {predicate}."))?;
            }

            // Occasionally a second label applies.
            let secondary = (rng.next_f64() < 0.25).then(|| rng.below(LABELS.len()));

            for label_idx in 0..LABELS.len() {
                let active = label_idx == primary || Some(label_idx) == secondary;
                let col = label_idx as u16 + 1;
                match indicator(&mut rng, active) {
                    Indicator::Number(v) => sheet.write_number(row, col, v)?,
                    Indicator::Text(s) => sheet.write_string(row, col, s)?,
                    Indicator::Bool(b) => sheet.write_boolean(row, col, b)?,
                    Indicator::Blank => continue,
                };
            }
        }
    }

    let xlsx_path = "sample_dataset.xlsx";
    workbook
        .save(xlsx_path)
        .with_context(|| format!("writing {xlsx_path}"))?;

    let label2id: serde_json::Map<String, serde_json::Value> = LABELS
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), json!(i)))
        .collect();
    let labelmap = json!({
        "text_column": TEXT_COLUMN,
        "label_names": LABELS,
        "label2id": label2id,
    });
    let labelmap_path = "sample_labelmap.json";
    std::fs::write(labelmap_path, serde_json::to_string_pretty(&labelmap)?)
        .with_context(|| format!("writing {labelmap_path}"))?;

    println!("Wrote {row} rows ({} labels) to {xlsx_path} and {labelmap_path}", LABELS.len());
    Ok(())
}
