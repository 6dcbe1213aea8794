// src/classify/mod.rs

//! Path-shape classification for staged package trees
//!
//! Every directory visited by the scanner is assigned a [`DirRole`]:
//!
//! | Role | Example | Treatment |
//! |------|---------|-----------|
//! | `Private` | `/usr/share/<pkg>/...` | scanned, stats kept per private root |
//! | `Public` | `/usr/lib/python3.11/site-packages` | scanned, extensions tagged |
//! | `Bin` | `/usr/bin` | scripts inspected for interpreter lines |
//! | `DistInfo` / `EggInfo` | `foo-1.0.dist-info` | metadata normalized and indexed |
//! | `Ordinary` | `/usr/share/doc/<pkg>` | only descended into |
//!
//! Classification is pure: it looks at the path string only.

mod classifier;

pub use classifier::{DirRole, PathClassifier, DEFAULT_PRIVATE_DIRS};
