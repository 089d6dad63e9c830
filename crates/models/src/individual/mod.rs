//! The `individual` logical model.

mod definition;
mod graphql;

pub use definition::definition;
pub use graphql::{
    Individual, IndividualConnection, IndividualCount, IndividualEdge, IndividualMutation,
    IndividualQuery,
};
