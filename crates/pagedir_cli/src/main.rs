/* 📖 # What does the pagedir binary do?

It has no argument parsing. Run it in a directory holding `pagedir.toml`:

1. the seed pages named by `pages_file` are created through the service,
   appended in file order unless they carry an explicit `order`
2. every `[[moves]]` entry is applied as an update of that page's order
3. each API's pages are printed in order, followed by its consistency report

Exit codes:
- 0: every page was created, every move applied and every partition is consistent
- 1: anything else
*/

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::process;

use tracing::{error, warn};

use pagedir_base::tracing::init_tracing;
use pagedir_engine::store::{InMemoryStore, StoreHandle};
use pagedir_engine::{ApiId, PageId, PageService, UpdatePage, load_config, load_seed_pages};

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let current_dir = env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });

    let config = match load_config(&current_dir.join("pagedir.toml")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config from pagedir.toml: {}", e);
            process::exit(1);
        }
    };

    println!("{}", config.title);

    let seeds = match load_seed_pages(&config.pages_file) {
        Ok(seeds) => seeds,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let service = PageService::new(StoreHandle::new(InMemoryStore::with_capacity(seeds.len())));
    let mut failures = 0;
    let mut ids: BTreeMap<(String, String), PageId> = BTreeMap::new();
    let mut apis: BTreeSet<String> = BTreeSet::new();

    for seed in seeds {
        let api = ApiId::from_string(seed.api.clone());
        let name = seed.page.name.clone();
        match service.create(&api, seed.page) {
            Ok(page) => {
                ids.insert((seed.api.clone(), name), page.id);
                apis.insert(seed.api);
            }
            Err(e) => {
                error!(api_id = %api, name = %name, error = %e, "Failed to create page");
                eprintln!("  - Failed to create page {} of {}: {}", name, api, e);
                failures += 1;
            }
        }
    }

    for mv in &config.moves {
        let Some(id) = ids.get(&(mv.api.clone(), mv.page.clone())) else {
            warn!(api_id = %mv.api, name = %mv.page, "Move refers to an unknown page");
            eprintln!("  - Unknown page {} in {}", mv.page, mv.api);
            failures += 1;
            continue;
        };
        let result = service.store().find_by_id(id).and_then(|current| match current {
            Some(current) => service.update(id, UpdatePage::from_page(&current).with_order(mv.order)),
            None => Err(pagedir_base::err!("Page {} disappeared", id)),
        });
        match result {
            Ok(page) => println!("  ~ {} in {} moved to {}", page.name, mv.api, page.order),
            Err(e) => {
                eprintln!("  - Failed to move {} in {} to {}: {}", mv.page, mv.api, mv.order, e);
                failures += 1;
            }
        }
    }

    for api in apis {
        let api = ApiId::from_string(api);
        println!("\n{}", api);
        match service.find_by_api(&api) {
            Ok(items) => {
                for item in items {
                    let published = if item.published { "" } else { " (draft)" };
                    println!("  {:>3}. {}{}", item.order, item.name, published);
                }
            }
            Err(e) => {
                eprintln!("  - Failed to list pages: {}", e);
                failures += 1;
            }
        }
        match service.check_partition(&api) {
            Ok(report) => {
                println!("{}", report);
                if !report.is_consistent() {
                    failures += 1;
                }
            }
            Err(e) => {
                eprintln!("  - Failed to check partition: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("\n{} operation(s) failed.", failures);
        process::exit(1);
    }
}
