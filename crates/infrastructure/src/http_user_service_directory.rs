use seatkeeper_application::{
    DEFAULT_SUBJECT_STREAM_BUFFER, SubjectRepository, SubjectSink, SubjectStream,
};
use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::Subject;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Page size used when none is configured.
pub const DEFAULT_USER_SERVICE_PAGE_SIZE: usize = 20;

const SORT_BY: &str = "principal";

/// Organization membership directory backed by an HTTP user service.
///
/// Members are fetched page by page in ascending principal order. A full page
/// means another page may follow; a short page ends the stream.
#[derive(Debug, Clone)]
pub struct HttpUserServiceDirectory {
    http_client: reqwest::Client,
    url: Url,
    page_size: usize,
}

impl HttpUserServiceDirectory {
    /// Creates a directory client with the default page size.
    #[must_use]
    pub fn new(http_client: reqwest::Client, url: Url) -> Self {
        Self {
            http_client,
            url,
            page_size: DEFAULT_USER_SERVICE_PAGE_SIZE,
        }
    }

    /// Overrides the page size. Zero is rejected when a stream starts.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery<'a> {
    by: UserQueryBy<'a>,
    include: UserQueryInclude,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserQueryBy<'a> {
    account_id: &'a str,
    with_paging: UserQueryPaging,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserQueryPaging {
    first_result_index: usize,
    max_results: usize,
    sort_by: &'static str,
    ascending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserQueryInclude {
    all_of: Vec<&'static str>,
}

impl<'a> UserQuery<'a> {
    fn page(org_id: &'a str, page: usize, page_size: usize) -> Self {
        Self {
            by: UserQueryBy {
                account_id: org_id,
                with_paging: UserQueryPaging {
                    first_result_index: page.saturating_mul(page_size),
                    max_results: page_size,
                    sort_by: SORT_BY,
                    ascending: true,
                },
            },
            include: UserQueryInclude {
                all_of: vec!["status"],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
}

impl UserEntry {
    fn into_subject(self, org_id: &str) -> AppResult<Subject> {
        if self.id.is_empty() || self.status.is_empty() {
            return Err(AppError::DirectoryUnavailable(format!(
                "user service returned an incomplete member of org '{org_id}' (id '{}', status '{}')",
                self.id, self.status
            )));
        }

        let enabled = self.status.eq_ignore_ascii_case("enabled");
        Ok(Subject::new(self.id, enabled))
    }
}

impl SubjectRepository for HttpUserServiceDirectory {
    fn get_by_org_id(&self, org_id: &str, cancellation: &CancellationToken) -> SubjectStream {
        let (sink, stream) = SubjectStream::channel(DEFAULT_SUBJECT_STREAM_BUFFER, cancellation);
        let directory = self.clone();
        let org_id = org_id.to_owned();

        tokio::spawn(async move {
            directory.stream_members(org_id, sink).await;
        });

        stream
    }
}

impl HttpUserServiceDirectory {
    async fn stream_members(self, org_id: String, sink: SubjectSink) {
        if self.page_size == 0 {
            sink.send(Err(AppError::DirectoryUnavailable(
                "user service page size must be greater than zero".to_owned(),
            )))
            .await;
            return;
        }

        let mut page = 0_usize;
        loop {
            let fetched = tokio::select! {
                () = sink.cancelled() => return,
                fetched = self.fetch_page(org_id.as_str(), page) => fetched,
            };

            let entries = match fetched {
                Ok(entries) => entries,
                Err(error) => {
                    tracing::warn!(org_id = %org_id, page, error = %error, "member page fetch failed");
                    sink.send(Err(error)).await;
                    return;
                }
            };

            let full_page = entries.len() == self.page_size;
            for entry in entries {
                let item = entry.into_subject(org_id.as_str());
                let stop = item.is_err();

                if !sink.send(item).await || stop {
                    return;
                }
            }

            if !full_page {
                return;
            }
            page += 1;
        }
    }

    async fn fetch_page(&self, org_id: &str, page: usize) -> AppResult<Vec<UserEntry>> {
        let query = UserQuery::page(org_id, page, self.page_size);

        let response = self
            .http_client
            .post(self.url.clone())
            .json(&query)
            .send()
            .await
            .map_err(|error| {
                AppError::DirectoryUnavailable(format!(
                    "user service request for org '{org_id}' page {page} failed: {error}"
                ))
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AppError::DirectoryUnavailable(format!(
                "user service returned status {status} for org '{org_id}' page {page}"
            )));
        }

        let body = response.bytes().await.map_err(|error| {
            AppError::DirectoryUnavailable(format!(
                "failed to read user service response for org '{org_id}': {error}"
            ))
        })?;

        serde_json::from_slice::<Vec<UserEntry>>(&body).map_err(|error| {
            AppError::DirectoryUnavailable(format!(
                "failed to decode user service response for org '{org_id}': {error}"
            ))
        })
    }
}

#[cfg(test)]
mod tests;
