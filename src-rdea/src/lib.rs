//! RDEA - robustness analysis for Data Envelopment Analysis
//!
//! Copyright (C) 2026 RDEA contributors
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.
//!
//! Given a set of decision-making units and a family of admissible
//! efficiency models - weight constraints, marginal value-function
//! envelopes, an optional criteria hierarchy, optionally imprecise or
//! ordinal performance data - this crate computes, for every unit, the
//! range of efficiency indicators compatible with the family and their
//! distributions under uniform sampling from it.
//!
//! Four model families are supported: the ratio model (CCR), the additive
//! value model (VDEA, flat or hierarchical), and their imprecise-data
//! variants. Six analyses run on each: extreme efficiency, extreme
//! distance to the best unit, extreme ranks, necessary/possible preference
//! relations, SMAA distributions, and pairwise efficiency outranking
//! indices.
//!
//! ```
//! use ndarray::array;
//! use rdea::{CcrProblem, ExtremeOptions, extreme_efficiency};
//!
//! let problem = CcrProblem::new(
//!     vec!["staff", "floor"],
//!     vec!["sales"],
//!     array![[4.0, 3.0], [7.0, 3.0], [8.0, 1.0]],
//!     array![[1.0], [1.0], [1.0]],
//! )?;
//! let eff = extreme_efficiency(&problem, &ExtremeOptions::default())?;
//! assert_eq!(eff.min.len(), 3);
//! # Ok::<(), rdea::DeaError>(())
//! ```

pub mod data;
pub mod drivers;
pub mod error;
pub mod hierarchy;
pub mod imprecise;
pub mod models;
mod sampling;
pub mod value_fn;

pub use data::{CcrProblem, ConstraintOp, VdeaProblem, WeightConstraint};
pub use drivers::smaa::SmaaIndicator;
pub use drivers::{
    CancelToken, ExtremeOptions, ExtremeValues, ModelRef, Peoi, PreferenceRelations, RankBounds,
    SmaaDistribution, SmaaOptions, extreme_distance, extreme_efficiency, extreme_ranks,
    preference_relations, smaa, smaa_preferences,
};
pub use error::{ConfigError, DeaError};
pub use hierarchy::Hierarchy;
pub use imprecise::{FactorData, ImpreciseCcrProblem, ImpreciseOptions, ImpreciseVdeaProblem};
pub use rdea_lp::Direction;
pub use value_fn::{Envelope, Polarity};
