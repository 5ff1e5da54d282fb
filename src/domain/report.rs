//! Persisted-output record (§6): the final best schedule serialized as a
//! flat record — tours with ordered points, per-day costs, and the visit
//! matrix. The only persistence format the core engine itself produces.

use serde::Serialize;

use crate::domain::ids::ContainerIdx;
use crate::domain::penalty::PenaltyController;
use crate::domain::problem::ProblemInstance;
use crate::domain::schedule::Schedule;

#[derive(Debug, Clone, Serialize)]
pub struct TourRecord {
    pub day: usize,
    pub truck: usize,
    pub point_ids: Vec<String>,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRecord {
    pub tours: Vec<TourRecord>,
    pub total_cost: f64,
    /// `visit_matrix[container_index][day]`.
    pub visit_matrix: Vec<Vec<bool>>,
}

impl ScheduleRecord {
    pub fn build(schedule: &Schedule, problem: &ProblemInstance, penalty: &PenaltyController) -> Self {
        let tours = schedule
            .tours()
            .iter()
            .map(|tour| TourRecord {
                day: tour.day(),
                truck: tour.truck().0,
                point_ids: tour
                    .points()
                    .iter()
                    .map(|&p| problem.point(p).id.clone())
                    .collect(),
                cost: tour.cost(problem, schedule.tracker(), penalty),
            })
            .collect();

        let visit_matrix = (0..problem.containers.len())
            .map(|c| {
                (0..problem.horizon)
                    .map(|d| schedule.tracker().visited(ContainerIdx(c), d))
                    .collect()
            })
            .collect();

        ScheduleRecord {
            tours,
            total_cost: schedule.cost(problem, penalty),
            visit_matrix,
        }
    }
}
