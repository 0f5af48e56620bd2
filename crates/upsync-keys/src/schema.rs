//! Named key constructors for the profile permission schema.

use crate::{Address, DataKey, array_element_key, array_key, mapping_key, singleton_key};

/// Namespace word shared by the permission mapping keys.
pub const PERMISSIONS_NAMESPACE: &str = "AddressPermissions";
/// Group word for a controller's permission bitmask.
pub const PERMISSIONS_GROUP: &str = "Permissions";
/// Group word for a controller's allowed-call restrictions.
pub const ALLOWED_CALLS_GROUP: &str = "AllowedCalls";
/// Full name of the controllers array.
pub const CONTROLLERS_ARRAY_NAME: &str = "AddressPermissions[]";

/// Key holding `controller`'s permission bitmask on an account.
pub fn permissions_key(controller: Address) -> DataKey {
    mapping_key(PERMISSIONS_NAMESPACE, PERMISSIONS_GROUP, controller)
}

/// Key holding `controller`'s allowed-call list on an account.
pub fn allowed_calls_key(controller: Address) -> DataKey {
    mapping_key(PERMISSIONS_NAMESPACE, ALLOWED_CALLS_GROUP, controller)
}

/// Key holding the controllers array length.
pub fn controllers_array_key() -> DataKey {
    array_key(CONTROLLERS_ARRAY_NAME)
}

/// Key holding the controller address at `index` of the controllers array.
pub fn controller_element_key(index: u128) -> DataKey {
    array_element_key(controllers_array_key(), index)
}

/// Key holding a named metadata pointer, e.g. `LSP4Metadata`.
pub fn metadata_key(name: &str) -> DataKey {
    singleton_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_key_vector() {
        // Documented key for the digital-asset metadata record.
        assert_eq!(
            metadata_key("LSP4Metadata").to_hex(),
            "0x9afb95cacc9f95858ec44aa8c3b685511002e30ae54415823f406128b85b238e",
        );
    }

    #[test]
    fn controller_element_keys_share_array_prefix() {
        let array = controllers_array_key();
        let elem = controller_element_key(7);
        assert_eq!(&elem.as_bytes()[..16], &array.as_bytes()[..16]);
        assert_eq!(elem.as_bytes()[31], 7);
    }
}
