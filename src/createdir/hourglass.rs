use workflow::{Graph, Job, JobType, TxName};

use super::{
    create_dir_sites, DirJobFactory, DirectoryStrategy, Error, LinkReport, DIRMANAGER_NAMESPACE,
};

/// Runs every directory job before anything else.
///
/// All directory jobs feed into one no-op barrier job, and every original
/// root of the workflow depends on that barrier.
pub struct HourGlass;

impl HourGlass {
    fn concat_job(name: &str) -> Job {
        let mut job = Job::new(
            name,
            JobType::CreateDir,
            TxName::new(Some(DIRMANAGER_NAMESPACE), "noop", None),
        );
        job.noop = true;
        job
    }
}

impl DirectoryStrategy for HourGlass {
    fn description(&self) -> &'static str {
        "HourGlass: all directories before any job"
    }

    fn add_create_dir_jobs(
        &self,
        graph: &mut Graph,
        factory: &DirJobFactory,
    ) -> Result<LinkReport, Error> {
        let sites: Vec<String> = create_dir_sites(graph).into_iter().collect();
        if sites.is_empty() {
            log::info!("no directories to create");
            return Ok(LinkReport::default());
        }
        let roots = graph.roots();
        let jobs = factory.make_jobs(graph, &sites)?;
        let concat = graph.add_node(Self::concat_job(&factory.concat_name(graph)))?;

        let mut report = LinkReport {
            dir_jobs: Vec::with_capacity(jobs.len()),
            concat: Some(concat),
            edges_added: 0,
        };
        for job in jobs {
            let id = graph.add_node(job)?;
            report.dir_jobs.push(id);
            if graph.add_edge(id, concat)? {
                report.edges_added += 1;
            }
        }
        for root in roots {
            if graph.add_edge(concat, root)? {
                report.edges_added += 1;
            }
        }
        Ok(report)
    }
}
