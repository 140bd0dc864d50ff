//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::io::{self, Write};

const GROUP_SIZE: u32 = 10;
const LINE_SIZE: u32 = 100;

/// Console progress indicator: one `.` per delivered point, grouped by ten,
/// with a running count at the end of every line of a hundred.
pub struct Progress<W: Write> {
    out: W,
    count: u32,
}

impl<W: Write> Progress<W> {
    pub fn new(out: W) -> Self {
        Self { out, count: 1 }
    }

    pub fn mark(&mut self) -> io::Result<()> {
        self.out.write_all(b".")?;
        if self.count % GROUP_SIZE == 0 {
            self.out.write_all(b" ")?;
        }
        if self.count % LINE_SIZE == 0 {
            writeln!(self.out, "{}", self.count)?;
            self.count = 0;
        }
        self.count += 1;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
