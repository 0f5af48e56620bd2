//! Diff computation: desired state against a snapshot of current state.
//!
//! Plans are side-effect-free with respect to the ledger. Grants are
//! additive (bitwise OR), revokes subtractive (AND NOT), and metadata
//! updates full replaces. The controller-array append is a read-modify-write
//! against the observed length: a concurrent writer committing between the
//! read and the caller's submission can clobber it, which is why the batch
//! records the observed length and callers re-verify and re-plan on
//! mismatch instead of resubmitting blindly.

use crate::reader::{RegistryReader, encode_array_length};
use crate::{ReconcileResult, WriteBatch};
use tracing::info;
use upsync_acl::{AllowedCallEntry, MetadataPointer, encode_permissions};
use upsync_keys::Address;
use upsync_ledger::DynLedger;

/// Desired additions for one controller.
#[derive(Clone, Debug, Default)]
pub struct GrantRequest {
    /// Capability names to set, e.g. `CALL`, `SUPER_SETDATA`. Unrecognized
    /// names fail the plan.
    pub capabilities: Vec<String>,
    /// Allowed-call entries to append. Entries already present on the ledger
    /// (same target and selector) are skipped.
    pub allowed_calls: Vec<AllowedCallEntry>,
}

impl GrantRequest {
    pub fn capabilities<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GrantRequest {
            capabilities: names.into_iter().map(Into::into).collect(),
            allowed_calls: Vec::new(),
        }
    }

    pub fn with_allowed_call(mut self, entry: AllowedCallEntry) -> Self {
        self.allowed_calls.push(entry);
        self
    }
}

/// Plans reconciliation batches from a reader's view of the registry.
#[derive(Clone)]
pub struct Reconciler {
    reader: RegistryReader,
}

impl Reconciler {
    pub fn new(ledger: DynLedger) -> Self {
        Self {
            reader: RegistryReader::new(ledger),
        }
    }

    pub fn with_reader(reader: RegistryReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &RegistryReader {
        &self.reader
    }

    /// Plan an additive grant for `controller` on `account`.
    ///
    /// Reads of the three independent keys are issued concurrently; the diff
    /// is computed only once all of them have completed. The resulting batch
    /// contains only writes whose values differ from the observed state.
    pub async fn plan_grant(
        &self,
        account: Address,
        controller: Address,
        request: &GrantRequest,
    ) -> ReconcileResult<WriteBatch> {
        let desired =
            encode_permissions(request.capabilities.iter().map(|n| (n.as_str(), true)))?;

        let (current, current_calls, controllers) = tokio::try_join!(
            self.reader.permissions(account, controller),
            self.reader.allowed_calls(account, controller),
            self.reader.controllers(account),
        )?;

        let mut batch = WriteBatch::new(account);

        let merged = current.union(&desired);
        if merged != current {
            batch.push(
                upsync_keys::permissions_key(controller),
                merged.as_bytes().to_vec(),
                format!(
                    "set permissions of {controller} to {merged} (was {current}, granting {})",
                    names(&request.capabilities),
                ),
            );
        }

        let new_entries = dedup_new_entries(&current_calls, &request.allowed_calls);
        if !new_entries.is_empty() {
            let mut full = current_calls.clone();
            full.extend(new_entries.iter().copied());
            batch.push(
                upsync_keys::allowed_calls_key(controller),
                upsync_acl::encode_allowed_calls(&full),
                format!(
                    "append {} allowed call(s) for {controller} ({} already present)",
                    new_entries.len(),
                    request.allowed_calls.len() - new_entries.len(),
                ),
            );
        }

        let already_listed = controllers.contains(&controller);
        if !already_listed && !merged.is_zero() {
            let observed = controllers.len() as u128;
            batch.push(
                upsync_keys::controllers_array_key(),
                encode_array_length(observed + 1),
                format!(
                    "grow controller array to {} (observed length {observed}; \
                     stale if another writer commits first)",
                    observed + 1,
                ),
            );
            batch.push(
                upsync_keys::controller_element_key(observed),
                controller.as_bytes().to_vec(),
                format!("store {controller} at controller index {observed}"),
            );
        }

        info!(
            %account,
            %controller,
            writes = batch.len(),
            "planned grant"
        );
        Ok(batch)
    }

    /// Plan a subtractive revoke for `controller` on `account`.
    ///
    /// Never removes the controller from the array; removal is a distinct,
    /// explicit operation at the caller's level.
    pub async fn plan_revoke(
        &self,
        account: Address,
        controller: Address,
        revoked_capabilities: &[String],
    ) -> ReconcileResult<WriteBatch> {
        let revoked =
            encode_permissions(revoked_capabilities.iter().map(|n| (n.as_str(), true)))?;
        let current = self.reader.permissions(account, controller).await?;

        let mut batch = WriteBatch::new(account);
        let remaining = current.difference(&revoked);
        if remaining != current {
            batch.push(
                upsync_keys::permissions_key(controller),
                remaining.as_bytes().to_vec(),
                format!(
                    "set permissions of {controller} to {remaining} (was {current}, revoking {})",
                    names(revoked_capabilities),
                ),
            );
        }
        info!(%account, %controller, writes = batch.len(), "planned revoke");
        Ok(batch)
    }

    /// Plan a metadata pointer update: always exactly one full-replace
    /// write, whether or not a pointer already exists.
    pub fn plan_metadata_update(
        &self,
        account: Address,
        name: &str,
        pointer: &MetadataPointer,
    ) -> WriteBatch {
        let mut batch = WriteBatch::new(account);
        let value = pointer.to_bytes();
        let summary = format!(
            "replace {name} pointer with {} ({} bytes of value)",
            pointer.url,
            value.len(),
        );
        batch.push(upsync_keys::metadata_key(name), value, summary);
        info!(%account, name, "planned metadata update");
        batch
    }
}

/// Desired entries not already present, deduplicated among themselves,
/// original order preserved.
fn dedup_new_entries(
    current: &[AllowedCallEntry],
    desired: &[AllowedCallEntry],
) -> Vec<AllowedCallEntry> {
    let mut fresh: Vec<AllowedCallEntry> = Vec::new();
    for entry in desired {
        let seen = current.iter().chain(fresh.iter()).any(|e| e.same_grant(entry));
        if !seen {
            fresh.push(*entry);
        }
    }
    fresh
}

fn names(capabilities: &[String]) -> String {
    if capabilities.is_empty() {
        "nothing".to_string()
    } else {
        capabilities.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upsync_acl::{CallType, CallTypes, FunctionSelector, InterfaceId};

    fn entry(target: u8, selector: [u8; 4]) -> AllowedCallEntry {
        AllowedCallEntry {
            call_types: CallTypes::new(&[CallType::Call]),
            target: Address::from([target; 20]),
            interface_id: InterfaceId::ANY,
            selector: FunctionSelector(selector),
        }
    }

    #[test]
    fn dedup_skips_present_and_internal_duplicates() {
        let current = vec![entry(1, [1, 1, 1, 1])];
        let desired = vec![
            entry(1, [1, 1, 1, 1]), // already on the ledger
            entry(2, [2, 2, 2, 2]),
            entry(2, [2, 2, 2, 2]), // duplicate within the request
        ];
        let fresh = dedup_new_entries(&current, &desired);
        assert_eq!(fresh, vec![entry(2, [2, 2, 2, 2])]);
    }

    #[test]
    fn dedup_keyed_by_target_and_selector_only() {
        let current = vec![entry(1, [1, 1, 1, 1])];
        let mut variant = entry(1, [1, 1, 1, 1]);
        variant.call_types = CallTypes::new(&[CallType::StaticCall]);
        assert!(dedup_new_entries(&current, &[variant]).is_empty());
    }
}
