//! Initial-solution construction (§4.7 step 1): one empty tour per
//! available truck per day, then greedy container insertion ordered by
//! overflow urgency, then one dump visit per non-empty tour.

use crate::domain::ids::PointIdx;
use crate::domain::penalty::PenaltyController;
use crate::domain::problem::ProblemInstance;
use crate::domain::schedule::Schedule;
use crate::errors::EngineResult;

pub fn build_initial_schedule(
    problem: &ProblemInstance,
    penalty: &PenaltyController,
) -> EngineResult<Schedule> {
    let mut schedule = Schedule::new_empty(problem)?;

    for &container in &problem.containers {
        let cidx = schedule.tracker().container_index_of(container).unwrap();
        let day = (0..problem.horizon)
            .max_by(|&a, &b| {
                schedule
                    .tracker()
                    .overflow_probability(cidx, a)
                    .total_cmp(&schedule.tracker().overflow_probability(cidx, b))
            })
            .unwrap_or(0);

        let tour_idxs: Vec<usize> = schedule.tours_on_day(day).collect();
        if tour_idxs.is_empty() {
            continue;
        }
        let mut best: Option<(usize, usize, f64)> = None;
        for &ti in &tour_idxs {
            let (pos, delta) =
                schedule
                    .tour(ti)
                    .best_container_insertion(problem, schedule.tracker(), penalty, container);
            if best.map_or(true, |(_, _, bd)| delta < bd) {
                best = Some((ti, pos, delta));
            }
        }
        if let Some((ti, pos, _)) = best {
            schedule.insert_container(problem, ti, pos, container)?;
        }
    }

    // One dump per tour that received at least one container. Among
    // candidate dumps, prefer the one whose own dumpInsertionRegret(d, 2)
    // is largest: its best slot is the one most costly to lose if grabbed
    // later instead of now (§4.3).
    for ti in 0..schedule.tours().len() {
        if problem.dumps.is_empty() || schedule.tour(ti).is_empty() {
            continue;
        }
        let mut best: Option<(usize, PointIdx, f64)> = None;
        for &dump in &problem.dumps {
            let (pos, regret) = schedule
                .tour(ti)
                .dump_insertion_regret(problem, schedule.tracker(), penalty, dump, 2)
                .expect("a non-empty tour has at least two feasible insertion positions");
            if best.as_ref().map_or(true, |&(_, _, best_regret)| regret > best_regret) {
                best = Some((pos, dump, regret));
            }
        }
        if let Some((pos, dump, _)) = best {
            schedule.tour_mut(ti).insert(pos, dump);
        }
    }

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PenaltyParams;
    use crate::domain::testutil::sample_irp_instance;

    #[test]
    fn every_container_gets_at_least_one_visit() {
        let problem = sample_irp_instance(4, 3, 10.0);
        let penalty = PenaltyController::new(PenaltyParams::default());
        let schedule = build_initial_schedule(&problem, &penalty).unwrap();
        for &c in &problem.containers {
            let cidx = schedule.tracker().container_index_of(c).unwrap();
            let visited_somewhere = (0..problem.horizon).any(|d| schedule.tracker().visited(cidx, d));
            assert!(visited_somewhere);
        }
    }
}
