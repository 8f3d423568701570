//! `whatsapp-rust` backend traits over [`JsonCredentialStore`].

use super::{
    from_hex, to_hex, JsonCredentialStore, LidMappingEntry, MutationMacEntry, PreKeyEntry,
    SyncKeyEntry,
};
use async_trait::async_trait;
use papagaio_core::error::BotError;
use wacore::appstate::hash::HashState;
use wacore::appstate::processor::AppStateMutationMAC;
use wacore::store::error::StoreError;
use wacore::store::traits::{
    AppStateSyncKey, AppSyncStore, DeviceListRecord, DeviceStore, LidPnMappingEntry,
    ProtocolStore, SignalStore,
};
use wacore::store::Device;

type Result<T> = wacore::store::error::Result<T>;

fn store_err(e: BotError) -> StoreError {
    StoreError::Serialization(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

fn decode_opt(value: Option<String>) -> Result<Option<Vec<u8>>> {
    value.map(|v| from_hex(&v)).transpose().map_err(store_err)
}

#[async_trait]
impl SignalStore for JsonCredentialStore {
    async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()> {
        self.update(|s| {
            s.identities.insert(address.to_string(), to_hex(&key));
        })
        .await
        .map_err(store_err)
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Vec<u8>>> {
        decode_opt(self.read(|s| s.identities.get(address).cloned()).await)
    }

    async fn delete_identity(&self, address: &str) -> Result<()> {
        self.update(|s| {
            s.identities.remove(address);
        })
        .await
        .map_err(store_err)
    }

    async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>> {
        decode_opt(self.read(|s| s.sessions.get(address).cloned()).await)
    }

    async fn put_session(&self, address: &str, session: &[u8]) -> Result<()> {
        self.update(|s| {
            s.sessions.insert(address.to_string(), to_hex(session));
        })
        .await
        .map_err(store_err)
    }

    async fn delete_session(&self, address: &str) -> Result<()> {
        self.update(|s| {
            s.sessions.remove(address);
        })
        .await
        .map_err(store_err)
    }

    async fn store_prekey(&self, id: u32, record: &[u8], uploaded: bool) -> Result<()> {
        self.update(|s| {
            s.prekeys.insert(
                id,
                PreKeyEntry {
                    record: to_hex(record),
                    uploaded,
                },
            );
        })
        .await
        .map_err(store_err)
    }

    async fn load_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        decode_opt(self.read(|s| s.prekeys.get(&id).map(|p| p.record.clone())).await)
    }

    async fn remove_prekey(&self, id: u32) -> Result<()> {
        self.update(|s| {
            s.prekeys.remove(&id);
        })
        .await
        .map_err(store_err)
    }

    async fn store_signed_prekey(&self, id: u32, record: &[u8]) -> Result<()> {
        self.update(|s| {
            s.signed_prekeys.insert(id, to_hex(record));
        })
        .await
        .map_err(store_err)
    }

    async fn load_signed_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        decode_opt(self.read(|s| s.signed_prekeys.get(&id).cloned()).await)
    }

    async fn load_all_signed_prekeys(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let all = self.read(|s| s.signed_prekeys.clone()).await;
        all.into_iter()
            .map(|(id, hex)| Ok((id, from_hex(&hex).map_err(store_err)?)))
            .collect()
    }

    async fn remove_signed_prekey(&self, id: u32) -> Result<()> {
        self.update(|s| {
            s.signed_prekeys.remove(&id);
        })
        .await
        .map_err(store_err)
    }

    async fn put_sender_key(&self, address: &str, record: &[u8]) -> Result<()> {
        self.update(|s| {
            s.sender_keys.insert(address.to_string(), to_hex(record));
        })
        .await
        .map_err(store_err)
    }

    async fn get_sender_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        decode_opt(self.read(|s| s.sender_keys.get(address).cloned()).await)
    }

    async fn delete_sender_key(&self, address: &str) -> Result<()> {
        self.update(|s| {
            s.sender_keys.remove(address);
        })
        .await
        .map_err(store_err)
    }
}

#[async_trait]
impl AppSyncStore for JsonCredentialStore {
    async fn get_sync_key(&self, key_id: &[u8]) -> Result<Option<AppStateSyncKey>> {
        let entry = self
            .read(|s| s.app_sync_keys.get(&to_hex(key_id)).cloned())
            .await;
        let Some(entry) = entry else {
            return Ok(None);
        };
        Ok(Some(AppStateSyncKey {
            key_data: from_hex(&entry.key_data).map_err(store_err)?,
            timestamp: entry.timestamp,
            fingerprint: from_hex(&entry.fingerprint).map_err(store_err)?,
        }))
    }

    async fn set_sync_key(&self, key_id: &[u8], key: AppStateSyncKey) -> Result<()> {
        self.update(|s| {
            s.app_sync_keys.insert(
                to_hex(key_id),
                SyncKeyEntry {
                    key_data: to_hex(&key.key_data),
                    timestamp: key.timestamp,
                    fingerprint: to_hex(&key.fingerprint),
                },
            );
        })
        .await
        .map_err(store_err)
    }

    async fn get_version(&self, name: &str) -> Result<HashState> {
        match self.read(|s| s.app_versions.get(name).cloned()).await {
            Some(value) => serde_json::from_value(value).map_err(ser_err),
            None => Ok(HashState::default()),
        }
    }

    async fn set_version(&self, name: &str, state: HashState) -> Result<()> {
        let value = serde_json::to_value(&state).map_err(ser_err)?;
        self.update(|s| {
            s.app_versions.insert(name.to_string(), value);
        })
        .await
        .map_err(store_err)
    }

    async fn put_mutation_macs(
        &self,
        name: &str,
        version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()> {
        self.update(|s| {
            let collection = s.mutation_macs.entry(name.to_string()).or_default();
            for m in mutations {
                collection.insert(
                    to_hex(&m.index_mac),
                    MutationMacEntry {
                        version,
                        value_mac: to_hex(&m.value_mac),
                    },
                );
            }
        })
        .await
        .map_err(store_err)
    }

    async fn get_mutation_mac(&self, name: &str, index_mac: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .read(|s| {
                s.mutation_macs
                    .get(name)
                    .and_then(|c| c.get(&to_hex(index_mac)))
                    .map(|e| e.value_mac.clone())
            })
            .await;
        decode_opt(value)
    }

    async fn delete_mutation_macs(&self, name: &str, index_macs: &[Vec<u8>]) -> Result<()> {
        self.update(|s| {
            if let Some(collection) = s.mutation_macs.get_mut(name) {
                for mac in index_macs {
                    collection.remove(&to_hex(mac));
                }
            }
        })
        .await
        .map_err(store_err)
    }
}

#[async_trait]
impl ProtocolStore for JsonCredentialStore {
    async fn get_skdm_recipients(&self, group_jid: &str) -> Result<Vec<String>> {
        Ok(self
            .read(|s| {
                s.skdm_recipients
                    .get(group_jid)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default()
            })
            .await)
    }

    async fn add_skdm_recipients(&self, group_jid: &str, device_jids: &[String]) -> Result<()> {
        self.update(|s| {
            s.skdm_recipients
                .entry(group_jid.to_string())
                .or_default()
                .extend(device_jids.iter().cloned());
        })
        .await
        .map_err(store_err)
    }

    async fn clear_skdm_recipients(&self, group_jid: &str) -> Result<()> {
        self.update(|s| {
            s.skdm_recipients.remove(group_jid);
        })
        .await
        .map_err(store_err)
    }

    async fn get_lid_mapping(&self, lid: &str) -> Result<Option<LidPnMappingEntry>> {
        Ok(self
            .read(|s| s.lid_mappings.get(lid).map(|e| to_lib_entry(lid, e)))
            .await)
    }

    async fn get_pn_mapping(&self, phone: &str) -> Result<Option<LidPnMappingEntry>> {
        Ok(self
            .read(|s| {
                s.lid_mappings
                    .iter()
                    .find(|(_, e)| e.phone_number == phone)
                    .map(|(lid, e)| to_lib_entry(lid, e))
            })
            .await)
    }

    async fn put_lid_mapping(&self, entry: &LidPnMappingEntry) -> Result<()> {
        self.update(|s| {
            s.lid_mappings.insert(
                entry.lid.clone(),
                LidMappingEntry {
                    phone_number: entry.phone_number.clone(),
                    created_at: entry.created_at,
                    updated_at: entry.updated_at,
                    learning_source: entry.learning_source.clone(),
                },
            );
        })
        .await
        .map_err(store_err)
    }

    async fn get_all_lid_mappings(&self) -> Result<Vec<LidPnMappingEntry>> {
        Ok(self
            .read(|s| {
                s.lid_mappings
                    .iter()
                    .map(|(lid, e)| to_lib_entry(lid, e))
                    .collect()
            })
            .await)
    }

    async fn save_base_key(&self, address: &str, message_id: &str, base_key: &[u8]) -> Result<()> {
        self.update(|s| {
            s.base_keys
                .entry(address.to_string())
                .or_default()
                .insert(message_id.to_string(), to_hex(base_key));
        })
        .await
        .map_err(store_err)
    }

    async fn has_same_base_key(
        &self,
        address: &str,
        message_id: &str,
        current_base_key: &[u8],
    ) -> Result<bool> {
        let expected = to_hex(current_base_key);
        Ok(self
            .read(|s| {
                s.base_keys
                    .get(address)
                    .and_then(|m| m.get(message_id))
                    .is_some_and(|k| *k == expected)
            })
            .await)
    }

    async fn delete_base_key(&self, address: &str, message_id: &str) -> Result<()> {
        self.update(|s| {
            if let Some(keys) = s.base_keys.get_mut(address) {
                keys.remove(message_id);
                if keys.is_empty() {
                    s.base_keys.remove(address);
                }
            }
        })
        .await
        .map_err(store_err)
    }

    async fn update_device_list(&self, record: DeviceListRecord) -> Result<()> {
        let value = serde_json::to_value(&record).map_err(ser_err)?;
        self.update(|s| {
            s.device_lists.insert(record.user.clone(), value);
        })
        .await
        .map_err(store_err)
    }

    async fn get_devices(&self, user: &str) -> Result<Option<DeviceListRecord>> {
        match self.read(|s| s.device_lists.get(user).cloned()).await {
            Some(value) => Ok(Some(serde_json::from_value(value).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    async fn mark_forget_sender_key(&self, group_jid: &str, participant: &str) -> Result<()> {
        self.update(|s| {
            s.forget_sender_keys
                .entry(group_jid.to_string())
                .or_default()
                .insert(participant.to_string());
        })
        .await
        .map_err(store_err)
    }

    async fn consume_forget_marks(&self, group_jid: &str) -> Result<Vec<String>> {
        self.update(|s| {
            s.forget_sender_keys
                .remove(group_jid)
                .map(|set| set.into_iter().collect())
                .unwrap_or_default()
        })
        .await
        .map_err(store_err)
    }
}

fn to_lib_entry(lid: &str, e: &LidMappingEntry) -> LidPnMappingEntry {
    LidPnMappingEntry {
        lid: lid.to_string(),
        phone_number: e.phone_number.clone(),
        created_at: e.created_at,
        updated_at: e.updated_at,
        learning_source: e.learning_source.clone(),
    }
}

#[async_trait]
impl DeviceStore for JsonCredentialStore {
    async fn save(&self, device: &Device) -> Result<()> {
        // Device keys use serde shapes only a binary format round-trips.
        let data = bincode::serialize(device).map_err(ser_err)?;
        self.update(|s| {
            s.device = Some(to_hex(&data));
        })
        .await
        .map_err(store_err)
    }

    async fn load(&self) -> Result<Option<Device>> {
        match self.read(|s| s.device.clone()).await {
            Some(hex) => {
                let data = from_hex(&hex).map_err(store_err)?;
                let device = bincode::deserialize(&data).map_err(ser_err)?;
                Ok(Some(device))
            }
            None => Ok(None),
        }
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.read(|s| s.is_paired()).await)
    }

    async fn create(&self) -> Result<i32> {
        // Single-device store; the record itself arrives through save().
        Ok(1)
    }
}
