use brine_rpc_schema::Service;

/// Something that turns a resolved service into source text for one target.
pub trait CodeGenerator {
    fn generate(&self, service: &Service) -> String;
}
