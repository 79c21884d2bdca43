mod container_infrastructure;

pub use container_infrastructure::{parse_ps_output, ContainerInfrastructure};
