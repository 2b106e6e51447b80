use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use seatkeeper_application::{
    DEFAULT_SUBJECT_STREAM_BUFFER, PrincipalRepository, SubjectRepository, SubjectStream,
};
use seatkeeper_core::AppResult;
use seatkeeper_domain::{Principal, Subject, SubjectId};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// In-memory principal and membership directory.
///
/// Unknown principals resolve to minimal principals carrying only their id.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    principals: RwLock<HashMap<SubjectId, Principal>>,
    members: Arc<RwLock<HashMap<String, Vec<Subject>>>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces principal metadata.
    pub async fn add_principal(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.id.clone(), principal);
    }

    /// Appends a member to an organization, replacing an earlier entry with
    /// the same id.
    pub async fn add_member(&self, org_id: &str, subject: Subject) {
        let mut members = self.members.write().await;
        let org_members = members.entry(org_id.to_owned()).or_default();

        match org_members
            .iter_mut()
            .find(|member| member.subject_id == subject.subject_id)
        {
            Some(existing) => *existing = subject,
            None => org_members.push(subject),
        }
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryDirectory {
    async fn get_by_id(&self, id: &SubjectId) -> AppResult<Principal> {
        if id.is_anonymous() {
            return Ok(Principal::anonymous());
        }

        Ok(self
            .principals
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_else(|| Principal::minimal(id.clone())))
    }

    async fn get_by_ids(&self, ids: &[SubjectId]) -> AppResult<Vec<Principal>> {
        let mut principals = Vec::with_capacity(ids.len());
        for id in ids {
            principals.push(self.get_by_id(id).await?);
        }

        Ok(principals)
    }
}

impl SubjectRepository for InMemoryDirectory {
    fn get_by_org_id(&self, org_id: &str, cancellation: &CancellationToken) -> SubjectStream {
        let (sink, stream) = SubjectStream::channel(DEFAULT_SUBJECT_STREAM_BUFFER, cancellation);
        let members = self.members.clone();
        let org_id = org_id.to_owned();

        tokio::spawn(async move {
            let snapshot = members.read().await.get(&org_id).cloned().unwrap_or_default();

            for member in snapshot {
                if !sink.send(Ok(member)).await {
                    return;
                }
            }
        });

        stream
    }
}
