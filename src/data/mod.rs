/// Data layer: core types, merging, and serialization.
///
/// Architecture:
/// ```text
///   weights  ionization  line list  levels/lines  zeta
///      │         │           │           │          │
///      ▼         ▼           ▼           ▼          ▼
///   ┌──────────────────────────────────────────────────┐
///   │                   SourceSet                      │  five SourceTables
///   └──────────────────────────────────────────────────┘
///                          │
///                          ▼
///                    ┌──────────┐
///                    │ combine   │  per-ion priority resolution
///                    └──────────┘
///                          │
///                          ▼
///                 ┌──────────────────┐
///                 │ CombinedDataset  │  name → DataTable
///                 └──────────────────┘
///                          │
///                          ▼
///                    ┌──────────┐
///                    │  writer   │  one Parquet artifact
///                    └──────────┘
/// ```
pub mod combine;
pub mod model;
pub mod writer;
