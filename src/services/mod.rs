pub(crate) mod deadline;
pub(crate) mod exams;
pub(crate) mod leaderboard;
pub(crate) mod payments;
pub(crate) mod scoring;
