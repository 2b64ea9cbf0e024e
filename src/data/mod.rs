/// Data layer: core types, loading, and label classification.
///
/// Architecture:
/// ```text
///  .xlsx / .ods / .csv / .parquet / .json        labelmap.json
///        │                                            │
///        ▼                                            ▼
///   ┌──────────┐                               ┌──────────┐
///   │  loader   │  parse file → Table          │ labelmap  │  validate keys
///   └──────────┘                               └──────────┘
///        │                                            │
///        ▼                                            │
///   ┌──────────┐                                      │
///   │  Table    │  columns, Vec<Row>                  │
///   └──────────┘                                      │
///        │                                            │
///        ▼                                            │
///   ┌───────────┐                                     │
///   │ indicator  │  row → (labels, label_ids)  ◄──────┘
///   └───────────┘
/// ```

pub mod indicator;
pub mod labelmap;
pub mod loader;
pub mod model;
