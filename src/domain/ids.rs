//! Arena index newtypes.
//!
//! Per the Design Notes ("Deep object graphs with shared references ...
//! Prefer arena allocation with integer indices"), `Truck <-> Point <->
//! ContainerTracker <-> Schedule` never hold pointers to each other; they
//! hold these indices into the arenas owned by [`crate::domain::problem::ProblemInstance`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TruckIdx(pub usize);

/// Index into `ProblemInstance::containers`, i.e. the subset of points that
/// are containers, *not* an index into `ProblemInstance::points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerIdx(pub usize);

impl From<PointIdx> for usize {
    fn from(p: PointIdx) -> usize {
        p.0
    }
}

impl From<TruckIdx> for usize {
    fn from(t: TruckIdx) -> usize {
        t.0
    }
}

impl From<ContainerIdx> for usize {
    fn from(c: ContainerIdx) -> usize {
        c.0
    }
}
