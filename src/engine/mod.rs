//! SA-ALNS engine (§4.7) and rolling-horizon driver (§4.8).

pub mod construct;
pub mod rolling;
pub mod sa_alns;

use crate::domain::problem::ProblemVariant;
use crate::operators::{destroy, repair, OperatorFn};

/// Stable per-variant operator-index surface (§6): which destroy/repair
/// functions are in play, and in what order (index `i` is the operator
/// the selector wheel at position `i` refers to).
pub fn operator_tables(variant: ProblemVariant) -> (Vec<OperatorFn>, Vec<OperatorFn>) {
    let destroys: Vec<OperatorFn> = vec![
        destroy::random_container_removal,
        destroy::worst_container_removal,
        destroy::shaw_removal_within_tour,
        destroy::empty_one_day,
        destroy::empty_one_truck,
        destroy::remove_random_dump,
        destroy::remove_worst_dump,
        destroy::remove_consecutive_visits,
        destroy::global_shaw_removal,
        destroy::weighted_relatedness_removal,
        destroy::cluster_removal,
    ];
    let repairs: Vec<OperatorFn> = vec![
        repair::random_container_insertion,
        repair::best_container_insertion,
        repair::shaw_insertion,
        repair::swap_assignment,
        repair::random_dump,
        repair::best_dump,
        repair::swap_dumps,
        repair::replace_random_dump,
        repair::reorder_dumps,
        repair::replace_starting_point,
        repair::k_regret_insertion,
    ];

    match variant {
        ProblemVariant::Irp => (destroys, repairs),
        ProblemVariant::IrpD => (destroys[0..5].to_vec(), repairs[0..4].to_vec()),
        ProblemVariant::Vrp => (destroys[0..6].to_vec(), repairs[0..10].to_vec()),
        ProblemVariant::Tsp => (destroys[0..5].to_vec(), repairs[0..4].to_vec()),
    }
}
