use super::client::{AthenaApi, ExecutionHandle, ResultPage};
use polyquery_error::Result;
use tracing::{debug, error};

/// Read every result page of a finished execution.
///
/// Columns come from the first page. A failed page discards everything read so
/// far.
pub async fn fetch_all_pages(api: &dyn AthenaApi, handle: &ExecutionHandle) -> Result<ResultPage> {
    let mut combined = fetch_page(api, handle, None, 0).await?;
    let mut next_token = combined.next_token.take();
    let mut page_index = 1usize;

    while let Some(token) = next_token {
        let page = fetch_page(api, handle, Some(&token), page_index).await?;
        combined.rows.extend(page.rows);
        next_token = page.next_token;
        page_index += 1;
    }

    debug!(
        execution_id = %handle,
        pages = page_index,
        rows = combined.rows.len(),
        "Fetched Athena results"
    );
    Ok(combined)
}

async fn fetch_page(
    api: &dyn AthenaApi,
    handle: &ExecutionHandle,
    token: Option<&str>,
    page_index: usize,
) -> Result<ResultPage> {
    let page = api.result_page(handle, token).await.map_err(|e| {
        error!(execution_id = %handle, page = page_index, error = %e, "Failed to fetch Athena result page");
        e.with_execution_id(handle.as_str())
    })?;
    debug!(
        execution_id = %handle,
        page = page_index,
        rows = page.rows.len(),
        has_more = page.next_token.is_some(),
        "Fetched Athena result page"
    );
    Ok(page)
}
