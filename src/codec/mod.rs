pub mod fixed_be;
