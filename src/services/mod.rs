pub mod cars;
pub mod customers;
pub mod users;

pub use cars::{CarService, CarView, Includes};
pub use customers::{CustomerInput, CustomerService};
pub use users::{LoginRequest, LoginResponse, UserInput, UserService};
