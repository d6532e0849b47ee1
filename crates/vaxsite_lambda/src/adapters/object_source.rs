use vaxsite_core::contract::{ObjectRef, ObjectTag};

pub trait ObjectSource {
    fn read_object(&self, object: &ObjectRef) -> Result<Vec<u8>, String>;
    fn read_tags(&self, object: &ObjectRef) -> Result<Vec<ObjectTag>, String>;
}
