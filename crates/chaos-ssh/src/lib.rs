mod ssh_infrastructure;

pub use ssh_infrastructure::SshInfrastructure;
