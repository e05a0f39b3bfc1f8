use workflow::Graph;

use super::{
    add_linked, create_dir_sites, required_site, DirJobFactory, DirectoryStrategy, Error,
    LinkReport, SiteIndex,
};

/// Links each directory job straight to every job that needs its directory.
pub struct Tentacles;

impl DirectoryStrategy for Tentacles {
    fn description(&self) -> &'static str {
        "Tentacles: an edge to every job that needs a directory"
    }

    fn add_create_dir_jobs(
        &self,
        graph: &mut Graph,
        factory: &DirJobFactory,
    ) -> Result<LinkReport, Error> {
        let index = SiteIndex::new(create_dir_sites(graph).into_iter().collect());
        let mut links = Vec::with_capacity(graph.len());
        for id in graph.ids() {
            if let Some(site) = required_site(graph, id) {
                links.push((index.require(graph, id, site)?, id));
            }
        }
        add_linked(graph, factory, index.sites(), links)
    }
}
