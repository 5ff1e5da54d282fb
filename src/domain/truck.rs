use crate::domain::ids::PointIdx;

#[derive(Debug, Clone, PartialEq)]
pub struct Truck {
    pub id: String,
    pub capacity_volume: f64,
    pub capacity_weight: f64,
    pub speed: f64,
    pub fixed_cost: f64,
    pub distance_cost: f64,
    pub time_cost: f64,
    pub home: PointIdx,
    pub current_start: PointIdx,
    /// Allowed final (destination) starting points; must include `home`.
    pub flexible_starts: Vec<PointIdx>,
    /// Length == horizon.
    pub availability: Vec<bool>,
    /// Length == horizon.
    pub required_return_home: Vec<bool>,
}

impl Truck {
    pub fn is_available(&self, day: usize) -> bool {
        self.availability.get(day).copied().unwrap_or(false)
    }

    pub fn must_return_home(&self, day: usize) -> bool {
        self.required_return_home.get(day).copied().unwrap_or(false)
    }

    pub fn is_valid(&self, horizon: usize) -> bool {
        !self.flexible_starts.is_empty()
            && self.flexible_starts.contains(&self.home)
            && self.availability.len() == horizon
            && self.required_return_home.len() == horizon
    }
}
