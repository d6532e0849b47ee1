pub mod object_source;
pub mod postgres;
pub mod site_gateway;
