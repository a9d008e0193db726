pub mod blood_relation;
pub mod individual;
pub mod marriage;
pub mod tree;
pub mod tree_access;
pub mod user;

pub use blood_relation::{BloodRelation, NewBloodRelation};
pub use individual::{DatePrecision, Gender, Individual, IndividualChanges, LifeEvent, NewIndividual};
pub use marriage::{Marriage, MarriageChanges, NewMarriage};
pub use tree::{NewTree, Tree, TreeChanges};
pub use tree_access::{NewTreeAccess, TreeAccess};
pub use user::{validate_email, validate_username, NewUser, User};
