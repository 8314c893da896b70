pub mod comparator;
pub mod evaluator;
pub mod resolver;

pub use comparator::{ compare, Comparison, Recommendation };
pub use evaluator::evaluate;
pub use resolver::{ resolve, Resolution };
