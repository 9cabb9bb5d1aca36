pub mod codec;
mod id;
pub mod keys;
mod node;
mod setting;

pub use codec::{EncodeError, FormatError, from_xml, to_xml};
pub use id::{IdGenerator, PackageId, SequentialIds};
pub use node::{PackageNode, PreOrder, is_unit_path};
pub use setting::{FromSettingValue, PackageSettings, SettingValue, TypeMismatchError};
