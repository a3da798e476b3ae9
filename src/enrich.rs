use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::filehost::{FileInfo, FileInfoService};

/// Look up every supported link concurrently, once per distinct link. Failed
/// lookups are logged and left out of the result; they never abort the others.
pub async fn fetch_file_infos(
    service: &dyn FileInfoService,
    links: &[String],
) -> HashMap<String, FileInfo> {
    let mut seen = HashSet::new();
    let lookups = links
        .iter()
        .filter(|link| service.supports(link) && seen.insert(*link))
        .map(|link| async move { (link.clone(), service.fetch_info(link).await) });

    let mut infos = HashMap::new();
    for (link, result) in join_all(lookups).await {
        match result {
            Ok(info) => {
                infos.insert(link, info);
            }
            Err(e) => {
                warn!(link = %link, error = %e, "failed to fetch file info");
            }
        }
    }

    debug!(requested = links.len(), resolved = infos.len(), "file info lookups done");
    infos
}

/// Build one candidate per link, in link order, annotated where the file host
/// answered. Links without metadata are kept with zero size and no quality.
pub async fn annotate(service: &dyn FileInfoService, links: Vec<String>) -> Vec<Candidate> {
    let infos = fetch_file_infos(service, &links).await;

    links
        .into_iter()
        .map(|link| {
            let info = infos.get(&link).cloned();
            let mut candidate = Candidate::new(link);
            if let Some(info) = info {
                candidate.enrich(info);
            }
            candidate
        })
        .collect()
}
