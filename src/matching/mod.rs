pub mod candidates;
pub mod chronology;
pub mod company;
pub mod criteria;
pub mod evidence;
pub mod manager;
pub mod monopoly;
pub mod normalize;
