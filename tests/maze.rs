//! Recursive fan-out: flood-fill a maze where every explored cell may spawn
//! up to four neighbor tasks, and a completion flag is raised when the exit
//! is found.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fibertask::{AtomicCounter, Task, TaskScheduler, TaskServices};

const MAZE_WIDTH: usize = 21;
const MAZE_HEIGHT: usize = 21;

// Entry on the left edge at (0, 1); exit marked 'E' near the bottom-right.
#[rustfmt::skip]
const MAZE_ROWS: [&str; MAZE_HEIGHT] = [
    "#####################",
    "        #           #",
    "####### # ##### ### #",
    "#     # #     # #   #",
    "# ### # ##### # # ###",
    "# #   #       # #   #",
    "# # ########### ### #",
    "# #             #   #",
    "# ############# # ###",
    "#               #   #",
    "####### ####### ### #",
    "#     # #     #     #",
    "# ### ### ### ##### #",
    "# #         #       #",
    "# # ####### ####### #",
    "# # #     #       # #",
    "# # # ### ####### # #",
    "# #   #           # #",
    "# ##### ########### #",
    "#       #          E#",
    "#####################",
];

struct Maze {
    cells: Vec<AtomicU8>,
}

impl Maze {
    fn new() -> Self {
        let cells = MAZE_ROWS
            .iter()
            .flat_map(|row| row.bytes())
            .map(AtomicU8::new)
            .collect();
        Maze { cells }
    }

    fn cell(&self, x: usize, y: usize) -> u8 {
        self.cells[y * MAZE_WIDTH + x].load(Ordering::SeqCst)
    }

    /// Claims an unexplored cell; only one task wins each cell, so no cell
    /// is ever explored twice.
    fn claim(&self, x: usize, y: usize) -> bool {
        self.cells[y * MAZE_WIDTH + x]
            .compare_exchange(b' ', b'*', Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn neighbors(x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        const DIRS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];
        DIRS.into_iter().filter_map(move |(dx, dy)| {
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            if (0..MAZE_WIDTH as isize).contains(&nx) && (0..MAZE_HEIGHT as isize).contains(&ny) {
                Some((nx as usize, ny as usize))
            } else {
                None
            }
        })
    }
}

fn check_branch(
    maze: Arc<Maze>,
    x: usize,
    y: usize,
    completed: AtomicCounter,
    in_flight: Arc<AtomicUsize>,
) -> Task {
    Task::new(move |ctx| {
        for (nx, ny) in Maze::neighbors(x, y) {
            match maze.cell(nx, ny) {
                b'E' => {
                    completed.store(1);
                    break;
                }
                b' ' => {
                    if maze.claim(nx, ny) {
                        in_flight.fetch_add(1, Ordering::SeqCst);
                        ctx.add_task(check_branch(
                            maze.clone(),
                            nx,
                            ny,
                            completed.clone(),
                            in_flight.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }
        in_flight.fetch_sub(1, Ordering::SeqCst);
    })
}

#[test]
fn test_maze_flood_fill_finds_exit() {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let scheduler = TaskScheduler::new(110.max(workers * 2), TaskServices::none()).unwrap();

    let maze = Arc::new(Maze::new());
    let completed = AtomicCounter::new(0);
    let in_flight = Arc::new(AtomicUsize::new(0));

    assert!(maze.claim(0, 1), "maze entry must be open");
    in_flight.fetch_add(1, Ordering::SeqCst);
    scheduler.add_task(check_branch(
        maze.clone(),
        0,
        1,
        completed.clone(),
        in_flight.clone(),
    ));

    // The flag is stored to 1 by whichever task reaches the exit first.
    scheduler.wait_for_counter(&completed, 1);
    assert_eq!(completed.load(), 1);

    // Let the remaining branches drain before shutting down.
    let deadline = Instant::now() + Duration::from_secs(30);
    while in_flight.load(Ordering::SeqCst) != 0 {
        assert!(Instant::now() < deadline, "maze tasks failed to drain");
        std::thread::sleep(Duration::from_millis(1));
    }

    let explored = (0..MAZE_HEIGHT)
        .flat_map(|y| (0..MAZE_WIDTH).map(move |x| (x, y)))
        .filter(|&(x, y)| maze.cell(x, y) == b'*')
        .count();
    assert!(explored > 0);

    scheduler.quit().unwrap();
}
